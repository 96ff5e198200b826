//! In-memory TTL cache keyed by document-id selections

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use lumen_common::time::{Clock, SystemClock};
use parking_lot::Mutex;
use tracing::debug;

use super::key::cache_key;

/// Default entry lifetime: 30 minutes
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// One memoized artifact
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    pub stored_at: DateTime<Utc>,
    /// Ids the key was derived from, used for per-document invalidation
    pub document_ids: Vec<String>,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (empty input, absent or expired entry).
    pub misses: u64,
    /// Number of entries dropped because they expired.
    pub evictions: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// TTL cache for artifacts derived from a set of documents
///
/// All operations take `&self` and are serialized by an internal mutex,
/// so one instance can be shared between tasks behind an `Arc`. Reads
/// mutate: an expired entry is removed by the `get` that finds it.
pub struct ResultCache<C = SystemClock> {
    ttl: TimeDelta,
    clock: C,
    inner: Mutex<CacheInner>,
}

impl ResultCache<SystemClock> {
    /// Cache on the wall clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl Default for ResultCache<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<C: Clock> ResultCache<C> {
    /// Cache reading time from `clock`
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Store `payload` for the selection, replacing any previous entry
    ///
    /// Ignored when the selection or the payload is empty.
    pub fn put<S: AsRef<str>>(&self, document_ids: &[S], payload: impl Into<String>) {
        let payload = payload.into();
        if payload.is_empty() {
            debug!("Result cache: ignoring empty payload");
            return;
        }
        let Some(key) = cache_key(document_ids) else {
            debug!("Result cache: ignoring put for empty selection");
            return;
        };

        let entry = CacheEntry {
            key: key.clone(),
            payload,
            stored_at: self.clock.now(),
            document_ids: document_ids.iter().map(|id| id.as_ref().to_string()).collect(),
        };

        debug!(key = %key, "Result cache: stored entry");
        self.inner.lock().entries.insert(key, entry);
    }

    /// Payload for the selection, if present and younger than the TTL
    ///
    /// Empty input, a missing entry and an expired entry are all reported
    /// as `None`. An expired entry is evicted.
    pub fn get<S: AsRef<str>>(&self, document_ids: &[S]) -> Option<String> {
        let mut inner = self.inner.lock();

        let Some(key) = cache_key(document_ids) else {
            inner.misses += 1;
            return None;
        };

        let now = self.clock.now();
        let lookup = inner
            .entries
            .get(&key)
            .map(|entry| (self.is_expired(entry, now), entry.payload.clone()));

        match lookup {
            None => {
                inner.misses += 1;
                debug!(key = %key, "Result cache: miss");
                None
            }
            Some((true, _)) => {
                inner.entries.remove(&key);
                inner.misses += 1;
                inner.evictions += 1;
                debug!(key = %key, "Result cache: evicted expired entry");
                None
            }
            Some((false, payload)) => {
                inner.hits += 1;
                debug!(key = %key, "Result cache: hit");
                Some(payload)
            }
        }
    }

    /// Raw entry for the selection, without expiry checks or statistics
    pub fn peek<S: AsRef<str>>(&self, document_ids: &[S]) -> Option<CacheEntry> {
        let key = cache_key(document_ids)?;
        self.inner.lock().entries.get(&key).cloned()
    }

    /// Drop the entry for exactly this selection; returns whether one existed
    pub fn invalidate<S: AsRef<str>>(&self, document_ids: &[S]) -> bool {
        let Some(key) = cache_key(document_ids) else {
            return false;
        };
        let removed = self.inner.lock().entries.remove(&key).is_some();
        if removed {
            debug!(key = %key, "Result cache: invalidated entry");
        }
        removed
    }

    /// Drop every entry derived from `document_id`; returns how many
    ///
    /// Used when a single document changes and every selection that
    /// includes it is stale.
    pub fn invalidate_document(&self, document_id: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| !entry.document_ids.iter().any(|id| id == document_id));
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(document_id, removed, "Result cache: invalidated entries for document");
        }
        removed
    }

    /// Remove every expired entry now instead of waiting for a read
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before - inner.entries.len();
        inner.evictions += removed as u64;
        removed
    }

    /// Empty the cache
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        debug!("Result cache: cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of hit/miss/eviction counters
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entry_count: inner.entries.len() as u64,
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lumen_common::time::ManualClock;

    fn cache() -> (ResultCache<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        (ResultCache::with_clock(DEFAULT_TTL, clock.clone()), clock)
    }

    #[test]
    fn test_put_then_get_any_order() {
        let (cache, _) = cache();
        cache.put(&["b", "a"], "mindmap");
        assert_eq!(cache.get(&["a", "b"]).as_deref(), Some("mindmap"));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let (cache, clock) = cache();
        cache.put(&["a"], "mindmap");

        clock.advance(TimeDelta::minutes(29));
        assert!(cache.get(&["a"]).is_some());

        clock.advance(TimeDelta::minutes(1));
        assert_eq!(cache.get(&["a"]), None);
        assert!(cache.peek(&["a"]).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let (cache, _) = cache();
        cache.put(&["a"], "x");
        cache.get(&["a"]);
        cache.get(&["a"]);
        cache.get(&["b"]);
        let none: [&str; 0] = [];
        cache.get(&none);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_ttl_accessor_round_trips() {
        let cache = ResultCache::new(Duration::from_secs(90));
        assert_eq!(cache.ttl(), Duration::from_secs(90));
        assert_eq!(ResultCache::<SystemClock>::default().ttl(), DEFAULT_TTL);
    }
}
