//! Result cache for artifacts derived from a set of documents
//!
//! Deriving a mindmap from a selection of documents is slow and, for the
//! same selection, deterministic. [`ResultCache`] memoizes the serialized
//! result under a key built from the document ids, independent of the
//! order they were selected in, and treats entries older than the TTL as
//! misses (evicting them lazily on read).
//!
//! ```
//! use lumen_study::cache::ResultCache;
//! use std::time::Duration;
//!
//! let cache = ResultCache::new(Duration::from_secs(30 * 60));
//! cache.put(&["notes-b", "notes-a"], "{\"root\":\"Biology\"}");
//!
//! assert_eq!(
//!     cache.get(&["notes-a", "notes-b"]).as_deref(),
//!     Some("{\"root\":\"Biology\"}")
//! );
//! ```

mod key;
mod result_cache;
mod session;

pub use key::{cache_key, needs_refresh, KEY_SEPARATOR};
pub use result_cache::{CacheEntry, CacheStats, ResultCache, DEFAULT_TTL};
pub use session::{MindmapSession, SelectionStep, StepOutcome};
