//! A thread-safe, generic in-memory cache that evicts along three dimensions
//! at once.
//!
//! # Features
//! - **LRU ordering**: every hit and every overwrite promotes the entry; the
//!   least-recently-used entry is the first eviction candidate.
//! - **Cost budget**: each entry carries a signed cost. While the total
//!   exceeds `max_cost`, entries are evicted from the LRU end.
//! - **Per-entry TTL**: expired entries read as misses and are reclaimed
//!   lazily on lookup and periodically by a background janitor thread.
//! - **Non-Clone values**: values are stored in an `Arc<V>` and handed out
//!   without cloning `V`.
//! - **Observability**: counters via [`Cache::metrics`], structured
//!   `tracing` events, and an optional [`EvictionListener`].
//!
//! ```no_run
//! use lru_ttl_cache::Cache;
//! use std::time::Duration;
//!
//! let cache = Cache::new(Duration::from_secs(1), 100).unwrap();
//! cache.set("hello", "world", Duration::from_secs(30), 1);
//! assert_eq!(cache.get("hello").as_deref(), Some(&"world"));
//! cache.close();
//! ```

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod listener;
pub mod metrics;

// Internal, crate-only modules
mod entry;
mod handle;
mod lru_list;
mod shared;
mod store;
mod task;
mod time;

// Re-export the primary user-facing types for convenience
pub use builder::{CacheBuilder, CacheConfig};
pub use error::BuildError;
pub use handle::{Cache, WeakCache};
pub use listener::{EvictionListener, EvictionReason};
pub use metrics::MetricsSnapshot;
