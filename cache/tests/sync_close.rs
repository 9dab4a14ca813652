mod common;

use common::build_test_cache;
use lru_ttl_cache::{Cache, CacheBuilder, EvictionReason};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_sync_close_clears_and_ignores_later_calls() {
  let cache = build_test_cache(100);
  cache.set("a", "A", Duration::ZERO, 1);

  cache.close();
  assert!(cache.is_closed());
  assert_eq!(cache.len(), 0);
  assert_eq!(cache.current_cost(), 0);

  cache.set("b", "B", Duration::ZERO, 1);
  assert!(cache.get("b").is_none());
  assert!(!cache.delete("b"));
  cache.clear();
  assert_eq!(cache.run_pending_tasks(), 0);
}

#[test]
fn test_sync_double_close_is_harmless() {
  let cache = build_test_cache(100);
  cache.close();
  cache.close();
  assert!(cache.is_closed());
}

#[test]
fn test_sync_concurrent_close_returns_only_once_closed() {
  let (entered_tx, entered_rx) = mpsc::channel();
  let entered_tx = Mutex::new(entered_tx);
  let cache: Cache<u32, u32> = CacheBuilder::new()
    .janitor_interval(Duration::from_millis(10))
    .eviction_listener(move |_key: u32, _value: Arc<u32>, reason: EvictionReason| {
      if reason == EvictionReason::Expired {
        let _ = entered_tx.lock().send(());
        // Keeps the janitor busy so the first closer is stuck joining it.
        thread::sleep(Duration::from_millis(300));
      }
    })
    .build()
    .unwrap();

  cache.set(1, 1, Duration::from_millis(1), 1);
  cache.set(2, 2, Duration::ZERO, 1);
  entered_rx
    .recv_timeout(Duration::from_secs(5))
    .expect("janitor never swept the expired entry");

  let first = {
    let cache = cache.clone();
    thread::spawn(move || cache.close())
  };
  thread::sleep(Duration::from_millis(50));

  cache.close();
  assert!(cache.is_closed());
  assert_eq!(cache.len(), 0);
  cache.set(3, 3, Duration::ZERO, 1);
  assert!(cache.get(&3).is_none());
  assert_eq!(cache.len(), 0);

  first.join().unwrap();
  assert!(cache.is_closed());
}

#[test]
fn test_sync_close_applies_to_clones() {
  let cache = build_test_cache(100);
  let other = cache.clone();
  cache.set("a", "A", Duration::ZERO, 1);

  other.close();

  assert!(cache.is_closed());
  assert!(cache.get("a").is_none());
}

#[test]
fn test_sync_close_does_not_wait_for_a_janitor_tick() {
  let cache: Cache<u32, u32> = CacheBuilder::new()
    .janitor_interval(Duration::from_secs(3600))
    .build()
    .unwrap();

  let started = Instant::now();
  cache.close();
  assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_sync_close_races_with_writers() {
  let cache: Cache<u32, u32> = Cache::new(Duration::from_millis(1), 50).unwrap();

  let handles: Vec<_> = (0..4)
    .map(|t| {
      let cache = cache.clone();
      thread::spawn(move || {
        for i in 0..5_000u32 {
          cache.set(i % 200, t, Duration::from_millis(2), 1);
          cache.get(&(i % 200));
        }
      })
    })
    .collect();

  thread::sleep(Duration::from_millis(5));
  cache.close();

  for handle in handles {
    handle.join().unwrap();
  }

  assert!(cache.is_closed());
  assert_eq!(cache.len(), 0);
  assert_eq!(cache.current_cost(), 0);
}

#[test]
fn test_sync_many_caches_can_be_created_and_dropped() {
  for _ in 0..64 {
    let cache: Cache<u32, u32> = Cache::new(Duration::from_millis(5), 10).unwrap();
    cache.set(1, 1, Duration::ZERO, 1);
    // Dropping the last handle stops the janitor without an explicit close.
    drop(cache);
  }
}
