use crate::builder::CacheBuilder;
use crate::error::BuildError;
use crate::listener::EvictionReason;
use crate::metrics::MetricsSnapshot;
use crate::shared::CacheShared;
use crate::store::Lookup;
use crate::task::janitor;
use crate::time;

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::trace;

/// A thread-safe cache with LRU ordering, a cost budget and per-entry TTL.
///
/// `Cache` is a cheap handle: cloning it shares the same underlying store.
/// A handle created with [`Cache::disabled`] has no store at all; every
/// operation on it is a no-op or a miss, which lets callers keep a cache
/// behind a feature flag without branching at every call site.
pub struct Cache<K, V> {
  pub(crate) shared: Option<Arc<CacheShared<K, V>>>,
}

impl<K, V> Clone for Cache<K, V> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K, V> fmt::Debug for Cache<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.shared {
      Some(shared) => f.debug_struct("Cache").field("shared", shared).finish(),
      None => f.write_str("Cache(disabled)"),
    }
  }
}

impl<K, V> Cache<K, V> {
  /// Returns a handle with no backing store.
  pub fn disabled() -> Self {
    Self { shared: None }
  }

  /// Returns `false` for handles created with [`Cache::disabled`].
  pub fn is_enabled(&self) -> bool {
    self.shared.is_some()
  }

  /// Returns a handle that does not keep the cache alive.
  ///
  /// An eviction listener that needs to reach its own cache should hold a
  /// `WeakCache`; a strong [`Cache`] inside the listener keeps the janitor
  /// running until [`close`](Cache::close) is called explicitly.
  pub fn downgrade(&self) -> WeakCache<K, V> {
    WeakCache {
      shared: self.shared.as_ref().map(Arc::downgrade),
    }
  }
}

/// A non-owning handle to a [`Cache`], obtained from [`Cache::downgrade`].
pub struct WeakCache<K, V> {
  shared: Option<Weak<CacheShared<K, V>>>,
}

impl<K, V> Clone for WeakCache<K, V> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K, V> fmt::Debug for WeakCache<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WeakCache")
      .field("alive", &self.upgrade().is_some())
      .finish()
  }
}

impl<K, V> WeakCache<K, V> {
  /// Returns a strong handle, or `None` once every [`Cache`] handle has been
  /// dropped. A weak handle to a disabled cache upgrades to a disabled cache.
  pub fn upgrade(&self) -> Option<Cache<K, V>> {
    match &self.shared {
      Some(weak) => weak.upgrade().map(|shared| Cache { shared: Some(shared) }),
      None => Some(Cache::disabled()),
    }
  }
}

impl<K, V> Cache<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Creates a cache whose janitor sweeps expired entries every
  /// `janitor_interval`, evicting least-recently-used entries whenever the
  /// total cost exceeds `max_cost`. A `max_cost` of zero or less disables
  /// cost eviction.
  pub fn new(janitor_interval: Duration, max_cost: i64) -> Result<Self, BuildError> {
    CacheBuilder::new()
      .janitor_interval(janitor_interval)
      .max_cost(max_cost)
      .build()
  }

  /// Returns a [`CacheBuilder`] for further configuration.
  pub fn builder() -> CacheBuilder<K, V> {
    CacheBuilder::new()
  }
}

impl<K, V> Cache<K, V>
where
  K: Eq + Hash + Clone,
{
  /// Looks up `key`, returning a shared reference to its value.
  ///
  /// A hit promotes the entry to most-recently-used. An entry whose TTL has
  /// elapsed is reported as a miss and removed on the spot.
  pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.lookup(key, |value| value.clone())
  }

  /// Looks up `key` and, if found, applies a closure to the value.
  ///
  /// Behaves like [`get`](Self::get) but avoids cloning the `Arc`. The closure
  /// runs while the cache lock is held, so it should be fast and must not
  /// call back into this cache.
  pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    F: FnOnce(&V) -> R,
  {
    self.lookup(key, |value| f(value.as_ref()))
  }

  fn lookup<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    F: FnOnce(&Arc<V>) -> R,
  {
    let shared = self.shared.as_deref()?;
    let now = time::now_nanos();

    let (result, expired) = {
      let mut guard = shared.store.write();
      let outcome = match guard.get(key, now) {
        Lookup::Hit(entry) => (Some(f(&entry.value)), None),
        Lookup::Expired(entry) => (None, Some(entry)),
        Lookup::Miss => (None, None),
      };
      outcome
    };

    if result.is_some() {
      shared.metrics.hits.fetch_add(1, Ordering::Relaxed);
    } else {
      shared.metrics.misses.fetch_add(1, Ordering::Relaxed);
    }

    if let Some(entry) = expired {
      shared.metrics.evicted_by_ttl.fetch_add(1, Ordering::Relaxed);
      shared.notify(vec![entry], EvictionReason::Expired);
    }

    result
  }

  /// "Peeks" at a value without updating its recency.
  ///
  /// Takes only the shared lock. Expired entries read as absent but are left
  /// for the next `get` or sweep to reclaim. Hit/miss counters are untouched.
  pub fn peek<Q>(&self, key: &Q) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let shared = self.shared.as_deref()?;
    let guard = shared.store.read();
    guard.peek(key, time::now_nanos()).map(|entry| entry.value())
  }

  /// Returns `true` if `key` is resident and not expired. Does not promote.
  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.shared.as_deref() {
      Some(shared) => shared.store.read().peek(key, time::now_nanos()).is_some(),
      None => false,
    }
  }

  /// Inserts or overwrites `key`.
  ///
  /// A zero `ttl` stores the entry until it is deleted or evicted. `cost` is
  /// added to the cache total; overwriting an entry swaps its old cost for
  /// the new one and promotes it. While the total exceeds `max_cost`, entries
  /// are evicted from the least-recently-used end, but never the entry just
  /// written, so a single entry costing more than the whole budget is still
  /// admitted. Keeping that entry is deliberate: evicting it as well would
  /// make such a `set` silently store nothing.
  pub fn set(&self, key: K, value: V, ttl: Duration, cost: i64) {
    let Some(shared) = self.shared.as_deref() else {
      return;
    };
    let expires_at = time::expiry_from_ttl(ttl);

    let outcome = {
      let mut guard = shared.store.write();
      guard.set(key, value, expires_at, cost)
    };
    let Some(outcome) = outcome else {
      return;
    };

    if outcome.inserted {
      shared.metrics.inserts.fetch_add(1, Ordering::Relaxed);
    } else {
      shared.metrics.updates.fetch_add(1, Ordering::Relaxed);
    }
    shared.metrics.record_cost_added(cost);

    if !outcome.evicted.is_empty() {
      shared
        .metrics
        .evicted_by_capacity
        .fetch_add(outcome.evicted.len() as u64, Ordering::Relaxed);
      trace!(evicted = outcome.evicted.len(), "cost budget exceeded");
      shared.notify(outcome.evicted, EvictionReason::Capacity);
    }
  }

  /// Removes `key`, returning `true` if it was resident.
  pub fn delete<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let Some(shared) = self.shared.as_deref() else {
      return false;
    };

    let removed = shared.store.write().remove(key);
    match removed {
      Some(entry) => {
        shared.metrics.deletes.fetch_add(1, Ordering::Relaxed);
        shared.notify(vec![entry], EvictionReason::Deleted);
        true
      }
      None => false,
    }
  }

  /// Removes every entry and resets the cost total. The janitor keeps running
  /// and no eviction notifications are sent.
  pub fn clear(&self) {
    if let Some(shared) = self.shared.as_deref() {
      shared.store.write().clear();
    }
  }

  /// Stops the janitor and drops every entry.
  ///
  /// Applies to every clone of this handle. Afterwards reads miss and writes
  /// are ignored. Closing twice is harmless.
  pub fn close(&self) {
    if let Some(shared) = self.shared.as_deref() {
      shared.close();
    }
  }

  /// Returns `true` once [`close`](Self::close) has run. Disabled handles
  /// always report `true`.
  pub fn is_closed(&self) -> bool {
    match self.shared.as_deref() {
      Some(shared) => shared.store.read().is_closed(),
      None => true,
    }
  }

  /// Runs the expired-sweep now, on the calling thread, and returns the
  /// number of entries it reclaimed.
  pub fn run_pending_tasks(&self) -> usize {
    match self.shared.as_deref() {
      Some(shared) => janitor::sweep_expired(&shared.store, &shared.metrics, shared.listener()),
      None => 0,
    }
  }

  /// The number of resident entries, including expired ones not yet reclaimed.
  pub fn len(&self) -> usize {
    self
      .shared
      .as_deref()
      .map_or(0, |shared| shared.store.read().len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The sum of the costs of all resident entries.
  pub fn current_cost(&self) -> i64 {
    self
      .shared
      .as_deref()
      .map_or(0, |shared| shared.store.read().current_cost())
  }

  /// The configured cost budget. Zero or less means unbounded.
  pub fn max_cost(&self) -> i64 {
    self
      .shared
      .as_deref()
      .map_or(0, |shared| shared.store.read().max_cost())
  }

  /// How often the janitor sweeps. `None` for disabled handles.
  pub fn janitor_interval(&self) -> Option<Duration> {
    self.shared.as_deref().map(|shared| shared.janitor_interval)
  }

  /// Returns a point-in-time snapshot of the cache's counters.
  pub fn metrics(&self) -> MetricsSnapshot {
    match self.shared.as_deref() {
      Some(shared) => {
        let (current_cost, len) = {
          let guard = shared.store.read();
          (guard.current_cost(), guard.len())
        };
        shared.metrics.snapshot(current_cost, len)
      }
      None => MetricsSnapshot::default(),
    }
  }

  /// Verifies that the key index, the recency list and the cost total agree.
  #[doc(hidden)]
  pub fn validate(&self) -> Result<(), String> {
    match self.shared.as_deref() {
      Some(shared) => shared.store.read().validate(),
      None => Ok(()),
    }
  }
}
