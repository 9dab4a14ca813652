use crate::listener::{self, EvictionListener, EvictionReason};
use crate::metrics::Metrics;
use crate::store::CacheStore;
use crate::time;

use std::hash::Hash;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use tracing::{debug, trace};

/// A context object holding the thread-safe parts of the cache that the
/// janitor needs to access. It never holds the cache handle itself, so
/// dropping the last handle is enough to stop the janitor.
pub(crate) struct JanitorContext<K, V> {
  pub(crate) store: Arc<RwLock<CacheStore<K, V>>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) listener: Option<Arc<dyn EvictionListener<K, V>>>,
}

#[derive(Default)]
struct ShutdownSignal {
  stopped: Mutex<bool>,
  condvar: Condvar,
}

/// The background task that runs the expired-sweep every tick.
pub(crate) struct Janitor {
  handle: Option<JoinHandle<()>>,
  signal: Arc<ShutdownSignal>,
}

impl Janitor {
  /// Spawns a new janitor thread.
  pub(crate) fn spawn<K, V>(context: JanitorContext<K, V>, tick_interval: Duration) -> io::Result<Self>
  where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
  {
    let signal = Arc::new(ShutdownSignal::default());
    let thread_signal = signal.clone();

    let handle = thread::Builder::new()
      .name("lru-ttl-cache-janitor".to_string())
      .spawn(move || {
        debug!(?tick_interval, "cache janitor started");
        let mut stopped = thread_signal.stopped.lock();
        while Self::wait_for_tick(&thread_signal, &mut stopped, tick_interval) {
          // The sweep takes the cache lock; the signal lock is released
          // meanwhile so `stop` never waits behind a sweep to publish its flag.
          MutexGuard::unlocked(&mut stopped, || {
            sweep_expired(&context.store, &context.metrics, context.listener.as_deref());
          });
        }
        debug!("cache janitor stopped");
      })?;

    Ok(Self {
      handle: Some(handle),
      signal,
    })
  }

  /// Parks until the next tick is due. Returns `false` once stop was requested.
  fn wait_for_tick(signal: &ShutdownSignal, stopped: &mut MutexGuard<'_, bool>, tick_interval: Duration) -> bool {
    let deadline = Instant::now().checked_add(tick_interval);
    while !**stopped {
      match deadline {
        Some(deadline) => {
          if signal.condvar.wait_until(stopped, deadline).timed_out() {
            return !**stopped;
          }
        }
        None => signal.condvar.wait(stopped),
      }
    }
    false
  }

  /// Signals the janitor thread to stop and waits for it to exit.
  ///
  /// When called from the janitor thread itself (an eviction listener that
  /// closes the cache) the join is skipped; the loop exits on its own.
  pub(crate) fn stop(mut self) {
    {
      let mut stopped = self.signal.stopped.lock();
      *stopped = true;
    }
    self.signal.condvar.notify_all();

    if let Some(handle) = self.handle.take() {
      if handle.thread().id() != thread::current().id() {
        let _ = handle.join();
      }
    }
  }
}

impl Drop for Janitor {
  fn drop(&mut self) {
    // Covers janitors that were never explicitly stopped.
    if self.handle.is_some() {
      *self.signal.stopped.lock() = true;
      self.signal.condvar.notify_all();
    }
  }
}

/// Runs one expired-sweep under the store's write lock, then reports the
/// reclaimed entries with the lock released. Returns how many were removed.
pub(crate) fn sweep_expired<K, V>(
  store: &RwLock<CacheStore<K, V>>,
  metrics: &Metrics,
  listener: Option<&dyn EvictionListener<K, V>>,
) -> usize
where
  K: Eq + Hash + Clone,
{
  let (expired, cost_freed) = {
    let mut guard = store.write();
    if guard.is_closed() {
      return 0;
    }
    let before = guard.current_cost();
    let expired = guard.remove_expired(time::now_nanos());
    (expired, before.wrapping_sub(guard.current_cost()))
  };

  metrics.sweeps.fetch_add(1, Ordering::Relaxed);
  let count = expired.len();
  if count > 0 {
    metrics
      .evicted_by_ttl
      .fetch_add(count as u64, Ordering::Relaxed);
    trace!(reclaimed = count, cost_freed, "expired-sweep finished");
  }

  listener::dispatch(listener, expired, EvictionReason::Expired);
  count
}
