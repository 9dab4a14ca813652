use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for the cache.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Hit/Miss Ratios ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Throughput ---
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) updates: CachePadded<AtomicU64>,
  pub(crate) deletes: CachePadded<AtomicU64>,

  // --- Eviction Stats ---
  pub(crate) evicted_by_capacity: CachePadded<AtomicU64>,
  pub(crate) evicted_by_ttl: CachePadded<AtomicU64>,
  pub(crate) sweeps: CachePadded<AtomicU64>,

  // --- Cost ---
  pub(crate) total_cost_added: CachePadded<AtomicU64>,

  created_at: Instant,
}

// Manual implementation of Default to handle the non-default `Instant`.
impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      updates: CachePadded::new(AtomicU64::new(0)),
      deletes: CachePadded::new(AtomicU64::new(0)),
      evicted_by_capacity: CachePadded::new(AtomicU64::new(0)),
      evicted_by_ttl: CachePadded::new(AtomicU64::new(0)),
      sweeps: CachePadded::new(AtomicU64::new(0)),
      total_cost_added: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn record_cost_added(&self, cost: i64) {
    // Negative costs are credits, not additions.
    if cost > 0 {
      self
        .total_cost_added
        .fetch_add(cost as u64, Ordering::Relaxed);
    }
  }

  /// Creates a point-in-time snapshot. `current_cost` and `len` come from the
  /// store because they are guarded by the cache lock, not by atomics.
  pub(crate) fn snapshot(&self, current_cost: i64, len: usize) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      updates: self.updates.load(Ordering::Relaxed),
      deletes: self.deletes.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      evicted_by_ttl: self.evicted_by_ttl.load(Ordering::Relaxed),
      sweeps: self.sweeps.load(Ordering::Relaxed),
      current_cost,
      len,
      total_cost_added: self.total_cost_added.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
  /// The number of successful lookups.
  pub hits: u64,
  /// The number of failed lookups, including lookups of expired entries.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// The number of `set` calls that created a new entry.
  pub inserts: u64,
  /// The number of `set` calls that overwrote an existing entry.
  pub updates: u64,
  /// The number of `delete` calls that removed an entry.
  pub deletes: u64,
  /// The number of entries evicted because the cost budget was exceeded.
  pub evicted_by_capacity: u64,
  /// The number of entries reclaimed after their TTL elapsed.
  pub evicted_by_ttl: u64,
  /// The number of expired-sweeps the janitor (or `run_pending_tasks`) has run.
  pub sweeps: u64,
  /// The current total cost of all entries in the cache.
  pub current_cost: i64,
  /// The number of entries currently resident.
  pub len: usize,
  /// The cumulative positive cost of all values ever written.
  pub total_cost_added: u64,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("updates", &self.updates)
      .field("deletes", &self.deletes)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("evicted_by_ttl", &self.evicted_by_ttl)
      .field("sweeps", &self.sweeps)
      .field("current_cost", &self.current_cost)
      .field("len", &self.len)
      .field("total_cost_added", &self.total_cost_added)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
