use crate::entry::CacheEntry;
use crate::lru_list::{NodeIndex, RecencyList};

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// The outcome of a lookup that is allowed to reclaim an expired entry.
pub(crate) enum Lookup<'a, K, V> {
  Hit(&'a CacheEntry<K, V>),
  /// The key was resident but past its TTL; the entry has been removed.
  Expired(CacheEntry<K, V>),
  Miss,
}

/// What a `set` did, so the caller can update metrics and notify listeners
/// after releasing the lock.
pub(crate) struct SetOutcome<K, V> {
  pub(crate) inserted: bool,
  /// The value that was overwritten, if any. Dropped outside the lock.
  pub(crate) replaced: Option<Arc<V>>,
  /// Entries evicted from the tail to get back under the cost budget.
  pub(crate) evicted: Vec<CacheEntry<K, V>>,
}

/// The mutable state of the cache: a key index over an intrusive recency
/// list, plus the running cost total. Every method assumes the caller holds
/// the cache's single write (or read) lock.
pub(crate) struct CacheStore<K, V> {
  index: HashMap<K, NodeIndex, ahash::RandomState>,
  list: RecencyList<K, V>,
  current_cost: i64,
  max_cost: i64,
  closed: bool,
}

impl<K, V> fmt::Debug for CacheStore<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheStore")
      .field("len", &self.list.len())
      .field("current_cost", &self.current_cost)
      .field("max_cost", &self.max_cost)
      .field("closed", &self.closed)
      .finish()
  }
}

impl<K, V> CacheStore<K, V>
where
  K: Eq + Hash + Clone,
{
  pub(crate) fn new(max_cost: i64) -> Self {
    Self {
      index: HashMap::with_hasher(ahash::RandomState::new()),
      list: RecencyList::new(),
      current_cost: 0,
      max_cost,
      closed: false,
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.index.len()
  }

  #[inline]
  pub(crate) fn current_cost(&self) -> i64 {
    self.current_cost
  }

  #[inline]
  pub(crate) fn max_cost(&self) -> i64 {
    self.max_cost
  }

  #[inline]
  pub(crate) fn is_closed(&self) -> bool {
    self.closed
  }

  /// Looks up `key`, promoting it on a hit and reclaiming it if expired.
  pub(crate) fn get<Q>(&mut self, key: &Q, now_nanos: u64) -> Lookup<'_, K, V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = match self.index.get(key) {
      Some(&index) => index,
      None => return Lookup::Miss,
    };

    let expired = self
      .list
      .get(index)
      .map_or(false, |entry| entry.is_expired_at(now_nanos));

    if expired {
      return match self.remove_node(index) {
        Some(entry) => Lookup::Expired(entry),
        None => Lookup::Miss,
      };
    }

    self.list.move_to_front(index);
    match self.list.get(index) {
      Some(entry) => Lookup::Hit(entry),
      None => Lookup::Miss,
    }
  }

  /// Looks up `key` without promoting it or reclaiming it.
  pub(crate) fn peek<Q>(&self, key: &Q, now_nanos: u64) -> Option<&CacheEntry<K, V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = *self.index.get(key)?;
    self
      .list
      .get(index)
      .filter(|entry| !entry.is_expired_at(now_nanos))
  }

  /// Inserts or overwrites `key`, then evicts from the tail while over budget.
  ///
  /// Returns `None` once the store has been closed.
  pub(crate) fn set(&mut self, key: K, value: V, expires_at: u64, cost: i64) -> Option<SetOutcome<K, V>> {
    if self.closed {
      return None;
    }

    let mut outcome = SetOutcome {
      inserted: false,
      replaced: None,
      evicted: Vec::new(),
    };

    if let Some(&index) = self.index.get(&key) {
      self.list.move_to_front(index);
      if let Some(entry) = self.list.get_mut(index) {
        self.current_cost = self.current_cost.wrapping_sub(entry.cost).wrapping_add(cost);
        entry.cost = cost;
        entry.expires_at = expires_at;
        outcome.replaced = Some(std::mem::replace(&mut entry.value, Arc::new(value)));
      }
    } else {
      let index = self
        .list
        .push_front(CacheEntry::new(key.clone(), value, expires_at, cost));
      self.index.insert(key, index);
      self.current_cost = self.current_cost.wrapping_add(cost);
      outcome.inserted = true;
    }

    self.evict_over_budget(&mut outcome.evicted);
    Some(outcome)
  }

  // The entry just written sits at the head, so stopping at one resident
  // entry admits any single entry regardless of its cost. Each iteration
  // removes a node, which bounds the loop even with negative costs.
  fn evict_over_budget(&mut self, evicted: &mut Vec<CacheEntry<K, V>>) {
    if self.max_cost <= 0 {
      return;
    }
    while self.current_cost > self.max_cost && self.list.len() > 1 {
      let Some(tail) = self.list.back() else {
        break;
      };
      match self.remove_node(tail) {
        Some(entry) => evicted.push(entry),
        None => break,
      }
    }
  }

  /// Removes `key` if present.
  pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let index = *self.index.get(key)?;
    self.remove_node(index)
  }

  /// Walks from the tail toward the head once, removing every entry whose
  /// TTL has elapsed.
  pub(crate) fn remove_expired(&mut self, now_nanos: u64) -> Vec<CacheEntry<K, V>> {
    let mut expired = Vec::new();
    let mut current = self.list.back();

    while let Some(index) = current {
      // Read the neighbour first; removal clears the node's links.
      current = self.list.prev_of(index);
      let is_expired = self
        .list
        .get(index)
        .map_or(false, |entry| entry.is_expired_at(now_nanos));
      if is_expired {
        if let Some(entry) = self.remove_node(index) {
          expired.push(entry);
        }
      }
    }

    expired
  }

  pub(crate) fn clear(&mut self) {
    self.index.clear();
    self.list.clear();
    self.current_cost = 0;
  }

  /// Marks the store closed and drops its contents. Later writes are ignored.
  pub(crate) fn close(&mut self) {
    self.closed = true;
    self.clear();
  }

  // Detaches a node from both the list and the index and credits its cost.
  fn remove_node(&mut self, index: NodeIndex) -> Option<CacheEntry<K, V>> {
    let entry = self.list.remove(index)?;
    self.index.remove(&entry.key);
    self.current_cost = self.current_cost.wrapping_sub(entry.cost);
    Some(entry)
  }

  /// Checks that the index, the list links and the cost total agree.
  pub(crate) fn validate(&self) -> Result<(), String> {
    let mut forward = 0usize;
    let mut cost_sum: i64 = 0;
    for (index, entry) in self.list.iter() {
      forward += 1;
      cost_sum = cost_sum.wrapping_add(entry.cost);
      match self.index.get(&entry.key) {
        Some(&mapped) if mapped == index => {}
        Some(_) => return Err("index maps a listed key to a different node".to_string()),
        None => return Err("listed key is missing from the index".to_string()),
      }
    }

    let mut backward = 0usize;
    let mut current = self.list.back();
    while let Some(index) = current {
      backward += 1;
      if backward > forward {
        return Err("backward walk is longer than forward walk".to_string());
      }
      current = self.list.prev_of(index);
    }

    if forward != backward {
      return Err(format!(
        "forward walk saw {} nodes but backward walk saw {}",
        forward, backward
      ));
    }
    if forward != self.index.len() || forward != self.list.len() {
      return Err(format!(
        "list has {} linked nodes, {} allocated, index has {} keys",
        forward,
        self.list.len(),
        self.index.len()
      ));
    }
    if cost_sum != self.current_cost {
      return Err(format!(
        "current_cost is {} but entries sum to {}",
        self.current_cost, cost_sum
      ));
    }
    if self.index.is_empty() != (self.list.front().is_none() && self.list.back().is_none()) {
      return Err("head/tail presence disagrees with index emptiness".to_string());
    }
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn keys_as_vec(&self) -> Vec<K> {
    self.list.iter().map(|(_, entry)| entry.key.clone()).collect()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn hit_value(store: &mut CacheStore<&'static str, &'static str>, key: &str, now: u64) -> Option<&'static str> {
    match store.get(key, now) {
      Lookup::Hit(entry) => Some(*entry.value),
      _ => None,
    }
  }

  #[test]
  fn set_then_get_promotes() {
    let mut store = CacheStore::new(0);
    store.set("a", "A", 0, 1);
    store.set("b", "B", 0, 1);
    store.set("c", "C", 0, 1);
    assert_eq!(store.keys_as_vec(), vec!["c", "b", "a"]);

    assert_eq!(hit_value(&mut store, "a", 1), Some("A"));
    assert_eq!(store.keys_as_vec(), vec!["a", "c", "b"]);
    store.validate().unwrap();
  }

  #[test]
  fn overwrite_updates_in_place_and_rebalances_cost() {
    let mut store = CacheStore::new(0);
    store.set("a", "A", 0, 3);
    store.set("b", "B", 0, 2);
    let outcome = store.set("a", "Z", 0, 7).unwrap();

    assert!(!outcome.inserted);
    assert_eq!(outcome.replaced.as_deref(), Some(&"A"));
    assert_eq!(store.len(), 2);
    assert_eq!(store.current_cost(), 9);
    assert_eq!(store.keys_as_vec(), vec!["a", "b"]);
    assert_eq!(hit_value(&mut store, "a", 1), Some("Z"));
    store.validate().unwrap();
  }

  #[test]
  fn cost_eviction_removes_from_tail() {
    let mut store = CacheStore::new(10);
    store.set("a", "A", 0, 3);
    store.set("b", "B", 0, 3);
    store.set("c", "C", 0, 3);
    let outcome = store.set("d", "D", 0, 4).unwrap();

    let evicted: Vec<_> = outcome.evicted.iter().map(|e| e.key).collect();
    assert_eq!(evicted, vec!["a"]);
    assert_eq!(store.keys_as_vec(), vec!["d", "c", "b"]);
    assert_eq!(store.current_cost(), 10);
    store.validate().unwrap();
  }

  #[test]
  fn oversize_entry_evicts_everything_else_and_stays() {
    let mut store = CacheStore::new(10);
    store.set("a", "A", 0, 1);
    store.set("b", "B", 0, 1);
    let outcome = store.set("huge", "H", 0, 50).unwrap();

    assert_eq!(outcome.evicted.len(), 2);
    assert_eq!(store.keys_as_vec(), vec!["huge"]);
    assert_eq!(store.current_cost(), 50);
    store.validate().unwrap();
  }

  #[test]
  fn negative_cost_is_stored_and_eviction_terminates() {
    let mut store = CacheStore::new(10);
    store.set("neg", "N", 0, -5);
    assert_eq!(store.current_cost(), -5);
    for key in ["a", "b", "c", "d", "e"] {
      store.set(key, "x", 0, 4);
    }
    assert!(store.current_cost() <= 10);
    assert!(store.len() >= 1);
    store.validate().unwrap();
  }

  #[test]
  fn non_positive_max_cost_disables_eviction() {
    let mut store = CacheStore::new(0);
    for i in 0..100 {
      let key: &'static str = Box::leak(format!("k{}", i).into_boxed_str());
      store.set(key, "v", 0, 1_000);
    }
    assert_eq!(store.len(), 100);
    assert_eq!(store.current_cost(), 100_000);
    store.validate().unwrap();
  }

  #[test]
  fn expired_lookup_reclaims_entry() {
    let mut store = CacheStore::new(0);
    store.set("a", "A", 100, 2);

    match store.get("a", 101) {
      Lookup::Expired(entry) => assert_eq!(entry.key, "a"),
      _ => panic!("expected an expired lookup"),
    }
    assert!(matches!(store.get("a", 101), Lookup::Miss));
    assert_eq!(store.current_cost(), 0);
    store.validate().unwrap();
  }

  #[test]
  fn peek_does_not_promote_or_reclaim() {
    let mut store = CacheStore::new(0);
    store.set("a", "A", 100, 1);
    store.set("b", "B", 0, 1);

    assert!(store.peek("a", 50).is_some());
    assert_eq!(store.keys_as_vec(), vec!["b", "a"]);
    assert!(store.peek("a", 101).is_none());
    assert_eq!(store.len(), 2);
  }

  #[test]
  fn remove_expired_sweeps_only_expired() {
    let mut store = CacheStore::new(0);
    store.set("old", "O", 10, 1);
    store.set("forever", "F", 0, 1);
    store.set("later", "L", 1_000, 1);
    store.set("mid", "M", 20, 1);

    let swept: Vec<_> = store.remove_expired(500).into_iter().map(|e| e.key).collect();
    assert_eq!(swept, vec!["old", "mid"]);
    assert_eq!(store.keys_as_vec(), vec!["later", "forever"]);
    assert_eq!(store.current_cost(), 2);
    store.validate().unwrap();
  }

  #[test]
  fn remove_absent_key_is_noop() {
    let mut store: CacheStore<&str, &str> = CacheStore::new(0);
    store.set("a", "A", 0, 1);
    assert!(store.remove("zzz").is_none());
    assert_eq!(store.len(), 1);
    assert!(store.remove("a").is_some());
    assert_eq!(store.current_cost(), 0);
    store.validate().unwrap();
  }

  #[test]
  fn close_rejects_later_writes() {
    let mut store = CacheStore::new(0);
    store.set("a", "A", 0, 1);
    store.close();
    assert!(store.is_closed());
    assert_eq!(store.len(), 0);
    assert!(store.set("b", "B", 0, 1).is_none());
    assert_eq!(store.len(), 0);
    store.validate().unwrap();
  }
}
