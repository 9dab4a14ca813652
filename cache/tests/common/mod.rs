#![allow(dead_code)]

use lru_ttl_cache::{Cache, CacheBuilder, EvictionListener, EvictionReason};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const JANITOR_TICK: Duration = Duration::from_millis(100);

pub fn build_test_cache(max_cost: i64) -> Cache<&'static str, &'static str> {
  Cache::new(JANITOR_TICK, max_cost).unwrap()
}

// A cache whose janitor effectively never fires, so tests control expiry.
pub fn build_quiet_cache(max_cost: i64) -> Cache<&'static str, &'static str> {
  CacheBuilder::new()
    .janitor_interval(Duration::from_secs(3600))
    .max_cost(max_cost)
    .build()
    .unwrap()
}

/// Asserts the index, list and cost total agree.
pub fn assert_consistent<K, V>(cache: &Cache<K, V>)
where
  K: Eq + std::hash::Hash + Clone,
{
  if let Err(violation) = cache.validate() {
    panic!("cache invariants violated: {}", violation);
  }
}

/// Records every eviction it is told about.
pub struct RecordingListener<K, V> {
  pub events: Arc<Mutex<Vec<(K, Arc<V>, EvictionReason)>>>,
}

impl<K, V> Clone for RecordingListener<K, V> {
  fn clone(&self) -> Self {
    Self {
      events: self.events.clone(),
    }
  }
}

impl<K: Clone, V> RecordingListener<K, V> {
  pub fn new() -> Self {
    Self {
      events: Arc::new(Mutex::new(Vec::new())),
    }
  }

  pub fn keys_for(&self, reason: EvictionReason) -> Vec<K> {
    self
      .events
      .lock()
      .iter()
      .filter(|(_, _, r)| *r == reason)
      .map(|(k, _, _)| k.clone())
      .collect()
  }
}

impl<K: Send, V: Send + Sync> EvictionListener<K, V> for RecordingListener<K, V> {
  fn on_evict(&self, key: K, value: Arc<V>, reason: EvictionReason) {
    self.events.lock().push((key, value, reason));
  }
}
