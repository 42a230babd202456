use std::hash::Hash;
use std::num::NonZeroUsize;

use crate::imports::*;

/*
    Types:
    * LruCache - Bounded map with strict access-order eviction.
      Entries live in a slot arena linked as a doubly linked list (head = most recently used),
      the index maps a key to its slot. Freed slots are reused so the arena never grows past capacity.
*/
#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    cap: NonZeroUsize,
    slots: Vec<Slot<K, V>>,
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(cap: NonZeroUsize) -> Self {
        Self {
            cap,
            slots: Vec::with_capacity(cap.get()),
            index: HashMap::with_capacity(cap.get()),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.promote(slot);
        Some(&self.slots[slot].value)
    }

    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            let old = std::mem::replace(&mut self.slots[slot].value, value);
            self.promote(slot);
            return Some(old);
        }

        let slot = match self.tail {
            // Full: the tail slot is reused for the new entry
            Some(tail) if self.slots.len() >= self.cap.get() => {
                self.unlink(tail);
                let evicted = std::mem::replace(
                    &mut self.slots[tail],
                    Slot {
                        key: key.clone(),
                        value,
                        prev: None,
                        next: None,
                    },
                );
                self.index.remove(&evicted.key);
                tail
            }
            _ => {
                self.slots.push(Slot {
                    key: key.clone(),
                    value,
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };

        self.index.insert(key, slot);
        self.push_front(slot);
        None
    }

    fn promote(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[slot].prev = None;
        self.slots[slot].next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.slots[slot].next = self.head;
        self.slots[slot].prev = None;
        if let Some(h) = self.head {
            self.slots[h].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    // Most recently used first
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let slot = &self.slots[cursor?];
            cursor = slot.next;
            Some((&slot.key, &slot.value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::LruCache;
    use std::num::NonZeroUsize;

    fn cache(cap: usize) -> LruCache<&'static str, i32> {
        LruCache::new(NonZeroUsize::new(cap).unwrap())
    }

    fn keys(cache: &LruCache<&'static str, i32>) -> Vec<&'static str> {
        cache.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn get_on_empty_returns_none() {
        let mut cache = cache(2);
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn put_existing_key_returns_old_value_and_updates() {
        let mut cache = cache(2);
        assert_eq!(cache.put("a", 1), None);
        assert_eq!(cache.put("a", 9), Some(1));
        assert_eq!(cache.get(&"a"), Some(&9));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_lru_when_capacity_exceeded() {
        let mut cache = cache(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        assert!(!cache.contains(&"a"));
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"c"), Some(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn get_promotes_to_mru_affecting_eviction() {
        let mut cache = cache(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        assert_eq!(cache.get(&"a"), Some(&1));
        cache.put("d", 4);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(keys(&cache), vec!["d", "a", "c"]);
    }

    #[test]
    fn put_counts_as_use() {
        let mut cache = cache(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 3);
        cache.put("c", 4);
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(&3));
    }

    #[test]
    fn miss_does_not_change_order() {
        let mut cache = cache(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"zzz"), None);
        assert_eq!(keys(&cache), vec!["b", "a"]);
    }

    #[test]
    fn long_trace_keeps_list_and_index_in_step() {
        let mut cache: LruCache<u8, u16> = LruCache::new(NonZeroUsize::new(4).unwrap());
        let mut reference: Vec<(u8, u16)> = Vec::new();

        let mut state: u64 = 0x1234_5678_9abc_def0;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for _ in 0..1000 {
            let roll = next() % 100;
            let key = (next() % 9) as u8;
            if roll < 60 {
                let expected = reference.iter().position(|(k, _)| *k == key).map(|pos| {
                    let entry = reference.remove(pos);
                    reference.insert(0, entry);
                    entry.1
                });
                assert_eq!(cache.get(&key).copied(), expected);
            } else {
                let value = (next() & 0xffff) as u16;
                if let Some(pos) = reference.iter().position(|(k, _)| *k == key) {
                    reference.remove(pos);
                } else if reference.len() == 4 {
                    reference.pop();
                }
                reference.insert(0, (key, value));
                cache.put(key, value);
            }
            let snapshot: Vec<(u8, u16)> = cache.iter().map(|(k, v)| (*k, *v)).collect();
            assert_eq!(snapshot, reference);
            assert_eq!(cache.len(), reference.len());
        }
    }

    #[test]
    fn capacity_one_keeps_last_used() {
        let mut cache = cache(1);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.len(), 1);
    }
}
