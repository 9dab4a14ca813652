use crate::entry::CacheEntry;

use generational_arena::{Arena, Index};

/// Handle to a node in a [`RecencyList`]. Stale handles never alias a
/// recycled slot because the arena is generational.
pub(crate) type NodeIndex = Index;

#[derive(Debug)]
pub(crate) struct Node<K, V> {
  pub(crate) entry: CacheEntry<K, V>,
  pub(crate) next: Option<Index>,
  pub(crate) prev: Option<Index>,
}

// An intrusive, arena-backed doubly-linked list ordered by recency.
// It knows nothing about keys or costs; the store keeps the index and the
// running total.
#[derive(Debug)]
pub(crate) struct RecencyList<K, V> {
  // Arena stores all nodes contiguously.
  nodes: Arena<Node<K, V>>,
  // Head is the most-recently-used item.
  head: Option<Index>,
  // Tail is the least-recently-used item.
  tail: Option<Index>,
}

impl<K, V> RecencyList<K, V> {
  pub(crate) fn new() -> Self {
    Self {
      nodes: Arena::new(),
      head: None,
      tail: None,
    }
  }

  // Helper to unlink a node from the list.
  // Does not free the arena slot.
  fn unlink(&mut self, index: Index) {
    let node = &self.nodes[index];
    let prev_node_idx = node.prev;
    let next_node_idx = node.next;

    if let Some(prev_idx) = prev_node_idx {
      self.nodes[prev_idx].next = next_node_idx;
    } else {
      self.head = next_node_idx;
    }

    if let Some(next_idx) = next_node_idx {
      self.nodes[next_idx].prev = prev_node_idx;
    } else {
      self.tail = prev_node_idx;
    }

    let node = &mut self.nodes[index];
    node.prev = None;
    node.next = None;
  }

  // Links an already-allocated, detached node in as the new head.
  fn link_front(&mut self, index: Index) {
    let old_head_idx = self.head;
    self.nodes[index].next = old_head_idx;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head_idx {
      self.nodes[old_head].prev = Some(index);
    }

    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  /// Allocates a node for `entry` and makes it the most-recently-used item.
  pub(crate) fn push_front(&mut self, entry: CacheEntry<K, V>) -> NodeIndex {
    let index = self.nodes.insert(Node {
      entry,
      next: None,
      prev: None,
    });
    self.link_front(index);
    index
  }

  /// Promotes a node to the head. A no-op for the current head or a stale index.
  pub(crate) fn move_to_front(&mut self, index: NodeIndex) {
    if self.head == Some(index) || !self.nodes.contains(index) {
      return;
    }
    self.unlink(index);
    self.link_front(index);
  }

  /// Detaches a node and hands its entry back to the caller.
  pub(crate) fn remove(&mut self, index: NodeIndex) -> Option<CacheEntry<K, V>> {
    if !self.nodes.contains(index) {
      return None;
    }
    self.unlink(index);
    self.nodes.remove(index).map(|node| node.entry)
  }

  /// The least-recently-used node, without touching the order.
  #[inline]
  pub(crate) fn back(&self) -> Option<NodeIndex> {
    self.tail
  }

  #[inline]
  pub(crate) fn front(&self) -> Option<NodeIndex> {
    self.head
  }

  /// The neighbour one step closer to the head.
  #[inline]
  pub(crate) fn prev_of(&self, index: NodeIndex) -> Option<NodeIndex> {
    self.nodes.get(index).and_then(|node| node.prev)
  }

  #[inline]
  pub(crate) fn get(&self, index: NodeIndex) -> Option<&CacheEntry<K, V>> {
    self.nodes.get(index).map(|node| &node.entry)
  }

  #[inline]
  pub(crate) fn get_mut(&mut self, index: NodeIndex) -> Option<&mut CacheEntry<K, V>> {
    self.nodes.get_mut(index).map(|node| &mut node.entry)
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  pub(crate) fn clear(&mut self) {
    self.nodes.clear();
    self.head = None;
    self.tail = None;
  }

  /// Walks the list from head (MRU) to tail (LRU).
  pub(crate) fn iter(&self) -> Iter<'_, K, V> {
    Iter {
      list: self,
      current: self.head,
    }
  }
}

pub(crate) struct Iter<'a, K, V> {
  list: &'a RecencyList<K, V>,
  current: Option<Index>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
  type Item = (NodeIndex, &'a CacheEntry<K, V>);

  fn next(&mut self) -> Option<Self::Item> {
    let index = self.current?;
    let node = &self.list.nodes[index];
    self.current = node.next;
    Some((index, &node.entry))
  }
}
