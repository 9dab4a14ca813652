use crate::entry::CacheEntry;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

/// Describes the reason an entry was removed from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
  /// The entry was removed because the total cost exceeded `max_cost`.
  Capacity,
  /// The entry was removed because its time-to-live (TTL) expired.
  Expired,
  /// The entry was removed by an explicit `delete`.
  Deleted,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Capacity => write!(f, "evicted due to cost budget"),
      EvictionReason::Expired => write!(f, "evicted due to expiration (TTL)"),
      EvictionReason::Deleted => write!(f, "manually deleted"),
    }
  }
}

/// A listener that can be registered with the cache to receive notifications
/// when entries are evicted.
///
/// `on_evict` runs on the thread that caused the eviction (a caller of
/// `set`, `get` or `delete`, or the janitor), after the cache lock has been
/// released. It may therefore call back into the cache.
pub trait EvictionListener<K, V>: Send + Sync {
  fn on_evict(&self, key: K, value: Arc<V>, reason: EvictionReason);
}

impl<K, V, F> EvictionListener<K, V> for F
where
  F: Fn(K, Arc<V>, EvictionReason) + Send + Sync,
{
  fn on_evict(&self, key: K, value: Arc<V>, reason: EvictionReason) {
    self(key, value, reason)
  }
}

/// Hands evicted entries to the listener, one call per entry.
///
/// Must be called without the cache lock held. A panicking listener is
/// contained and logged so it cannot unwind through a cache operation.
pub(crate) fn dispatch<K, V>(
  listener: Option<&dyn EvictionListener<K, V>>,
  evicted: Vec<CacheEntry<K, V>>,
  reason: EvictionReason,
) {
  let Some(listener) = listener else {
    return;
  };
  for entry in evicted {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
      listener.on_evict(entry.key, entry.value, reason)
    }));
    if outcome.is_err() {
      warn!(%reason, "eviction listener panicked");
    }
  }
}
