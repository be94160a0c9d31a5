//! lru.rs
//! Bounded, access-ordered key → value map with least-recently-used eviction.
//!
//! - Nodes live in a slab (`Vec<Option<Node>>`) and are linked by slot index, newest at `head`.
//! - A `HashMap` maps keys to slots; freed slots are recycled through a free list.
//! - Every `get`/`put` moves the touched entry to the head; overflow on insert evicts the tail.
//!
//! Single-owner structure: no interior locking, never shared across threads.
//!
//! ```text
//!   head ─► [slot 4] ◄──► [slot 0] ◄──► [slot 2] ◄── tail
//!           newest                      eviction candidate
//! ```

use std::{collections::HashMap, hash::Hash};

const NIL: usize = usize::MAX;

// Upper bound on up-front reservation; larger caches grow on demand.
const PREALLOC_LIMIT: usize = 1 << 22;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Fixed-capacity LRU map. `len() <= capacity()` holds after every public call.
#[derive(Debug)]
pub struct LruCache<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
    evictions: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize) -> Self {
        let reserve = capacity.saturating_add(1).min(PREALLOC_LIMIT);
        Self {
            index: HashMap::with_capacity(reserve),
            slots: Vec::with_capacity(reserve),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
            evictions: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries dropped by capacity overflow since construction.
    #[inline]
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Membership test that does not update recency.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        self.slots[idx].as_ref().map(|n| &n.value)
    }

    /// Inserts or overwrites `key`, marking it most recently used.
    ///
    /// Returns the previous value when the key was already present. A fresh
    /// insert that pushes the size past capacity evicts exactly one entry,
    /// the least recently touched one.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            self.touch(idx);
            return self.slots[idx]
                .as_mut()
                .map(|n| std::mem::replace(&mut n.value, value));
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.attach_head(idx);
        self.index.insert(key, idx);

        if self.index.len() > self.capacity && self.pop_lru().is_some() {
            self.evictions += 1;
        }
        None
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.detach(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        Some(node.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        let idx = self.tail;
        self.detach(idx);
        let node = self.slots[idx].take()?;
        self.index.remove(&node.key);
        self.free.push(idx);
        Some((node.key, node.value))
    }

    /// Least recently used entry, without touching it.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.slots
            .get(self.tail)?
            .as_ref()
            .map(|n| (&n.key, &n.value))
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.slots.get(cursor)?.as_ref()?;
            cursor = node.next;
            Some((&node.key, &node.value))
        })
    }

    // ========================================================================
    // Recency list plumbing
    // ========================================================================

    #[inline]
    fn links(&self, idx: usize) -> (usize, usize) {
        self.slots[idx]
            .as_ref()
            .map_or((NIL, NIL), |n| (n.prev, n.next))
    }

    #[inline]
    fn set_prev(&mut self, idx: usize, prev: usize) {
        if let Some(n) = self.slots[idx].as_mut() {
            n.prev = prev;
        }
    }

    #[inline]
    fn set_next(&mut self, idx: usize, next: usize) {
        if let Some(n) = self.slots[idx].as_mut() {
            n.next = next;
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = self.links(idx);
        if prev == NIL {
            self.head = next;
        } else {
            self.set_next(prev, next);
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.set_prev(next, prev);
        }
        self.set_prev(idx, NIL);
        self.set_next(idx, NIL);
    }

    fn attach_head(&mut self, idx: usize) {
        let old_head = self.head;
        self.set_prev(idx, NIL);
        self.set_next(idx, old_head);
        if old_head == NIL {
            self.tail = idx;
        } else {
            self.set_prev(old_head, idx);
        }
        self.head = idx;
    }

    #[inline]
    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.detach(idx);
            self.attach_head(idx);
        }
    }

    /// Walks the recency list in both directions and cross-checks the index.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if self.len() > self.capacity {
            return Err(format!("len {} exceeds capacity {}", self.len(), self.capacity));
        }

        let mut forward = 0usize;
        let mut prev = NIL;
        let mut cursor = self.head;
        while cursor != NIL {
            let node = self.slots[cursor]
                .as_ref()
                .ok_or_else(|| format!("linked slot {} is vacant", cursor))?;
            if node.prev != prev {
                return Err(format!("slot {} has prev {} expected {}", cursor, node.prev, prev));
            }
            if self.index.get(&node.key) != Some(&cursor) {
                return Err(format!("index does not point at slot {}", cursor));
            }
            forward += 1;
            prev = cursor;
            cursor = node.next;
        }
        if prev != self.tail {
            return Err(format!("tail {} but walk ended at {}", self.tail, prev));
        }
        if forward != self.len() {
            return Err(format!("list holds {} nodes, index holds {}", forward, self.len()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
