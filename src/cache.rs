//! Fixed-capacity least-recently-used cache.
//!
//! Entries live in a slab of nodes linked into a recency list by index; a hash
//! map points each key at its slot. Lookup, insert, promotion and eviction
//! are all O(1).

use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Bounded key/value store that evicts the least recently used entry.
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    /// Most recently used
    head: usize,
    /// Least recently used
    tail: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Membership test that does not touch recency
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Return the value for `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.promote(idx);
        Some(&self.nodes[idx].value)
    }

    /// Insert or overwrite `key`, making it most recently used.
    ///
    /// When the cache is full the least recently used entry is evicted and
    /// its slot reused.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            self.nodes[idx].value = value;
            self.promote(idx);
            return;
        }

        let idx = if self.nodes.len() < self.capacity {
            self.nodes.push(Node {
                key: key.clone(),
                value,
                prev: NIL,
                next: NIL,
            });
            self.nodes.len() - 1
        } else {
            let idx = self.tail;
            self.unlink(idx);
            let node = &mut self.nodes[idx];
            self.map.remove(&node.key);
            node.key = key.clone();
            node.value = value;
            idx
        };

        self.push_front(idx);
        self.map.insert(key, idx);
    }

    fn promote(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let mut cache = LruCache::new(2);
        cache.put("AI", 1);
        assert_eq!(cache.get(&"AI"), Some(&1));
        assert_eq!(cache.get(&"AI"), Some(&1));
        assert_eq!(cache.get(&"DB"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recent() {
        let mut cache = LruCache::new(3);
        cache.put("A", 1);
        cache.put("B", 2);
        cache.put("C", 3);
        cache.put("D", 4);

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&"A"));
        assert!(cache.contains(&"B"));
        assert!(cache.contains(&"C"));
        assert!(cache.contains(&"D"));
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = LruCache::new(3);
        cache.put("A", 1);
        cache.put("B", 2);
        cache.put("C", 3);
        assert_eq!(cache.get(&"A"), Some(&1));
        cache.put("D", 4);

        assert!(cache.contains(&"A"));
        assert!(!cache.contains(&"B"));

        cache.put("E", 5);
        assert!(!cache.contains(&"C"));
        assert!(cache.contains(&"A"));
    }

    #[test]
    fn test_overwrite_updates_value_and_recency() {
        let mut cache = LruCache::new(2);
        cache.put("A", 1);
        cache.put("B", 2);
        cache.put("A", 10);
        cache.put("C", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"A"), Some(&10));
        assert!(!cache.contains(&"B"));
    }

    #[test]
    fn test_capacity_one() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put("A", 1);
        cache.put("B", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"B"), Some(&2));
        assert_eq!(cache.get(&"A"), None);
    }

    #[test]
    fn test_long_churn_stays_bounded() {
        let mut cache = LruCache::new(4);
        for i in 0..100 {
            cache.put(i, i * 2);
            if i % 3 == 0 {
                cache.get(&(i / 2));
            }
        }
        assert_eq!(cache.len(), 4);
        for i in 96..100 {
            assert_eq!(cache.get(&i), Some(&(i * 2)));
        }
    }
}
