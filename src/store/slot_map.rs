//! Sharded concurrent map with atomic insert-if-absent.
//!
//! ## Architecture
//!
//! ```text
//!   key ──► hasher.hash_one(key) % shards ──► RwLock<HashMap<K, T, S>>
//!
//!   get              read lock on one shard, clone the entry
//!   insert_if_absent write lock on one shard, keep the existing entry if any
//!   clear            write lock on every shard, then empty them
//! ```
//!
//! ## Key Components
//!
//! - [`SlotMap`]: the map. Entries are cheap clones (`Arc<Slot<V>>`,
//!   `Option<Arc<V>>`, [`ValueRef<V>`](crate::reference::ValueRef)).
//!
//! ## Thread Safety
//!
//! - Operations on keys in different shards never contend.
//! - `insert_if_absent` is the only cross-key synchronization point the
//!   memoizing caches use; it decides which of several racing entries wins.
//! - `clear` holds every shard's write lock at once, so a reader sees either
//!   the full map or the empty one, never a partial clear.

use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

/// Concurrent map from keys to cloneable entries, split into locked shards.
#[derive(Debug)]
pub struct SlotMap<K, T, S = RandomState> {
    shards: Box<[RwLock<HashMap<K, T, S>>]>,
    len: AtomicUsize,
    hasher: S,
}

impl<K, T> SlotMap<K, T, RandomState>
where
    K: Eq + Hash,
{
    /// Create a map with `shards` shards and the default hasher.
    pub fn new(shards: usize) -> Self {
        Self::with_hasher(shards, RandomState::new())
    }
}

impl<K, T> Default for SlotMap<K, T, RandomState>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new(default_shard_count())
    }
}

impl<K, T, S> SlotMap<K, T, S> {
    /// Return the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T, S> SlotMap<K, T, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Create a map with `shards` shards and a custom hasher.
    ///
    /// A shard count of zero is clamped to one.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        let shard_count = shards.max(1);
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::with_hasher(hasher.clone())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            len: AtomicUsize::new(0),
            hasher,
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &RwLock<HashMap<K, T, S>> {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Fetch a clone of the entry for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<T>
    where
        T: Clone,
    {
        self.shard(key).read().get(key).cloned()
    }

    /// Check whether an entry exists for `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Insert `value` unless `key` already has an entry.
    ///
    /// Returns `None` if `value` was inserted, or a clone of the entry that
    /// was already present (and `value` is dropped).
    pub fn insert_if_absent(&self, key: K, value: T) -> Option<T>
    where
        T: Clone,
    {
        match self.shard(&key).write().entry(key) {
            Entry::Occupied(existing) => Some(existing.get().clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                self.len.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Insert or replace the entry for `key`. Returns the previous entry.
    pub fn insert(&self, key: K, value: T) -> Option<T> {
        let previous = self.shard(&key).write().insert(key, value);
        if previous.is_none() {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        previous
    }

    /// Remove the entry for `key`.
    pub fn remove(&self, key: &K) -> Option<T> {
        let removed = self.shard(key).write().remove(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove every entry.
    ///
    /// Entries are dropped after all shard locks are released.
    pub fn clear(&self) {
        let mut guards = Vec::with_capacity(self.shards.len());
        for shard in self.shards.iter() {
            guards.push(shard.write());
        }
        let drained = guards
            .iter_mut()
            .flat_map(|guard| guard.drain())
            .collect::<Vec<_>>();
        self.len.store(0, Ordering::Relaxed);
        drop(guards);
        drop(drained);
    }
}

/// Shard count used when none is configured.
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get().next_power_of_two() * 4)
        .unwrap_or(16)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn insert_if_absent_keeps_first_entry() {
        let map = SlotMap::new(4);
        assert_eq!(map.insert_if_absent("k", 1), None);
        assert_eq!(map.insert_if_absent("k", 2), Some(1));
        assert_eq!(map.get(&"k"), Some(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insert_replaces_and_remove_deletes() {
        let map = SlotMap::new(2);
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(1));
        assert!(map.contains_key(&"a"));
        assert_eq!(map.remove(&"a"), Some(2));
        assert!(!map.contains_key(&"a"));
        assert!(map.is_empty());
    }

    #[test]
    fn zero_shards_is_clamped() {
        let map: SlotMap<u64, u64> = SlotMap::new(0);
        assert_eq!(map.shard_count(), 1);
    }

    #[test]
    fn clear_empties_every_shard() {
        let map = SlotMap::new(8);
        for i in 0..100_u64 {
            map.insert(i, i * 2);
        }
        assert_eq!(map.len(), 100);

        map.clear();

        assert!(map.is_empty());
        assert!((0..100_u64).all(|i| map.get(&i).is_none()));
    }

    #[test]
    fn concurrent_insert_if_absent_has_single_winner() {
        let threads = 8;
        let map: Arc<SlotMap<&str, usize>> = Arc::new(SlotMap::new(4));
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|tid| {
                let map = Arc::clone(&map);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    map.insert_if_absent("shared", tid).is_none()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(map.len(), 1);
    }
}
