use std::sync::Arc;

/// A container for a value in the cache, holding all necessary metadata.
#[derive(Debug)]
pub(crate) struct CacheEntry<K, V> {
  /// The key, kept alongside the value so a list node can find its index slot.
  pub(crate) key: K,
  /// The user's value, wrapped in an Arc for shared ownership.
  pub(crate) value: Arc<V>,
  /// The expiration timestamp in nanoseconds since the cache epoch. 0 means no TTL.
  pub(crate) expires_at: u64,
  /// The cost this entry contributes to the cache total. May be negative.
  pub(crate) cost: i64,
}

impl<K, V> CacheEntry<K, V> {
  pub(crate) fn new(key: K, value: V, expires_at: u64, cost: i64) -> Self {
    Self {
      key,
      value: Arc::new(value),
      expires_at,
      cost,
    }
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  /// Checks whether the entry's TTL has elapsed at `now_nanos`.
  #[inline]
  pub(crate) fn is_expired_at(&self, now_nanos: u64) -> bool {
    self.expires_at > 0 && self.expires_at < now_nanos
  }
}
