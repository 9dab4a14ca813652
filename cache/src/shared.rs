use crate::error::BuildError;
use crate::listener::{self, EvictionListener, EvictionReason};
use crate::metrics::Metrics;
use crate::store::CacheStore;
use crate::task::janitor::{Janitor, JanitorContext};

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// The internal, thread-safe core of the cache.
///
/// `store` is the single lock guarding the index, the recency list and the
/// cost total. Nothing else in here is ever locked while `store` is held.
pub(crate) struct CacheShared<K, V> {
  pub(crate) store: Arc<RwLock<CacheStore<K, V>>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) listener: Option<Arc<dyn EvictionListener<K, V>>>,
  pub(crate) janitor: Mutex<Option<Janitor>>,
  pub(crate) janitor_interval: Duration,
}

impl<K, V> fmt::Debug for CacheShared<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("janitor_interval", &self.janitor_interval)
      .field("has_listener", &self.listener.is_some())
      .field("janitor_running", &self.janitor.lock().is_some())
      .finish_non_exhaustive()
  }
}

impl<K, V> Drop for CacheShared<K, V> {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.get_mut().take() {
      janitor.stop();
    }
  }
}

impl<K, V> CacheShared<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Builds an empty store and starts its janitor.
  pub(crate) fn new(
    janitor_interval: Duration,
    max_cost: i64,
    listener: Option<Arc<dyn EvictionListener<K, V>>>,
  ) -> Result<Self, BuildError> {
    let store = Arc::new(RwLock::new(CacheStore::new(max_cost)));
    let metrics = Arc::new(Metrics::new());

    let janitor_context = JanitorContext {
      store: Arc::clone(&store),
      metrics: Arc::clone(&metrics),
      listener: listener.clone(),
    };
    let janitor = Janitor::spawn(janitor_context, janitor_interval)
      .map_err(|err| BuildError::JanitorSpawn(err.to_string()))?;

    Ok(Self {
      store,
      metrics,
      listener,
      janitor: Mutex::new(Some(janitor)),
      janitor_interval,
    })
  }
}

impl<K, V> CacheShared<K, V>
where
  K: Eq + Hash + Clone,
{
  #[inline]
  pub(crate) fn listener(&self) -> Option<&dyn EvictionListener<K, V>> {
    self.listener.as_deref()
  }

  /// Hands evicted entries to the listener. Never call with `store` locked.
  #[inline]
  pub(crate) fn notify(&self, evicted: Vec<crate::entry::CacheEntry<K, V>>, reason: EvictionReason) {
    listener::dispatch(self.listener(), evicted, reason);
  }

  /// Stops the janitor, then empties the store and refuses later writes.
  ///
  /// Every caller closes the store before returning, even when a concurrent
  /// caller took the janitor and is still joining it.
  pub(crate) fn close(&self) {
    let janitor = self.janitor.lock().take();
    if let Some(janitor) = janitor {
      janitor.stop();
    }

    let mut store = self.store.write();
    if store.is_closed() {
      return;
    }
    store.close();
    drop(store);
    debug!("cache closed");
  }
}
