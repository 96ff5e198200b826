//! Result cache behavior as seen by callers

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use lumen_common::time::ManualClock;
use lumen_study::cache::{needs_refresh, ResultCache, DEFAULT_TTL};

fn cache_at_noon() -> (ResultCache<ManualClock>, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    (ResultCache::with_clock(DEFAULT_TTL, clock.clone()), clock)
}

#[test]
fn test_selection_order_does_not_matter() {
    let (cache, _) = cache_at_noon();
    cache.put(&["b", "a"], "mindmap-ab");

    assert_eq!(cache.get(&["a", "b"]).as_deref(), Some("mindmap-ab"));
    assert_eq!(cache.get(&["b", "a"]).as_deref(), Some("mindmap-ab"));
    assert_eq!(cache.get(&["a"]), None);
}

#[test]
fn test_repeated_ids_address_the_same_entry() {
    let (cache, _) = cache_at_noon();
    cache.put(&["a", "b"], "first");
    assert_eq!(cache.get(&["b", "a", "a"]).as_deref(), Some("first"));

    cache.put(&["a", "a", "b"], "second");
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&["a", "b"]).as_deref(), Some("second"));
}

#[test]
fn test_entry_expires_after_thirty_minutes_and_is_removed() {
    let (cache, clock) = cache_at_noon();
    cache.put(&["a", "b"], "mindmap-ab");

    clock.advance(TimeDelta::minutes(30));
    assert_eq!(cache.get(&["a", "b"]), None);
    assert!(cache.peek(&["a", "b"]).is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_put_refreshes_timestamp() {
    let (cache, clock) = cache_at_noon();
    cache.put(&["a"], "v1");

    clock.advance(TimeDelta::minutes(20));
    cache.put(&["a"], "v2");

    clock.advance(TimeDelta::minutes(20));
    assert_eq!(cache.get(&["a"]).as_deref(), Some("v2"));
}

#[test]
fn test_empty_inputs_are_ignored() {
    let (cache, _) = cache_at_noon();
    let none: [&str; 0] = [];

    cache.put(&none, "orphan");
    cache.put(&["a"], "");

    assert!(cache.is_empty());
    assert_eq!(cache.get(&none), None);
    assert_eq!(cache.get(&["a"]), None);
}

#[test]
fn test_invalidate_document_drops_every_selection_containing_it() {
    let (cache, _) = cache_at_noon();
    cache.put(&["a", "b"], "ab");
    cache.put(&["b", "c"], "bc");
    cache.put(&["c"], "c");

    assert_eq!(cache.invalidate_document("b"), 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&["c"]).as_deref(), Some("c"));
    assert_eq!(cache.invalidate_document("zzz"), 0);
}

#[test]
fn test_invalidate_exact_selection() {
    let (cache, _) = cache_at_noon();
    cache.put(&["a", "b"], "ab");

    assert!(cache.invalidate(&["b", "a"]));
    assert!(!cache.invalidate(&["b", "a"]));
    assert_eq!(cache.get(&["a", "b"]), None);
}

#[test]
fn test_purge_expired_keeps_fresh_entries() {
    let (cache, clock) = cache_at_noon();
    cache.put(&["old"], "stale");

    clock.advance(TimeDelta::minutes(25));
    cache.put(&["new"], "fresh");

    clock.advance(TimeDelta::minutes(10));
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&["new"]).as_deref(), Some("fresh"));

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.entry_count, 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_shared_between_threads() {
    let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                let id = format!("doc-{}", i);
                cache.put(&[id.as_str()], format!("payload-{}", i));
                cache.get(&[id.as_str()])
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(format!("payload-{}", i)));
    }
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.stats().hits, 4);
}

#[test]
fn test_mindmap_refresh_flow() {
    let (cache, _) = cache_at_noon();
    let previous = ["a", "b"];
    cache.put(&previous, "mindmap-ab");

    // Same selection reordered: reuse the cached mindmap
    let reordered = ["b", "a"];
    assert!(!needs_refresh(&previous, &reordered));
    assert_eq!(cache.get(&reordered).as_deref(), Some("mindmap-ab"));

    // New member: regenerate
    let grown = ["a", "b", "c"];
    assert!(needs_refresh(&previous, &grown));
    assert_eq!(cache.get(&grown), None);
}
