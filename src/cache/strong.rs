//! Memoizing cache backed by plain strong references.
//!
//! Same contract as [`SoftCache`](crate::cache::soft::SoftCache) without the
//! reclamation path: an entry, once inserted, is immutable and lives as long
//! as the cache. The map stores `Option<Arc<V>>` directly, so a hit is one
//! shard read lock and an `Arc` clone.
//!
//! Useful as a baseline when testing cache behaviour independently of
//! reclamation timing, and for values that must never be dropped silently.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::metrics::CacheMetrics;
use crate::metrics::counters::CacheCounters;
use crate::store::slot_map::{SlotMap, default_shard_count};
use crate::traits::{InstanceFactory, MemoizingCache};

/// Thread-safe memoizing cache whose values are never reclaimed.
pub struct StrongCache<K, V, D, F, S = RandomState> {
    entries: SlotMap<K, Option<Arc<V>>, S>,
    factory: F,
    counters: CacheCounters,
    _data: PhantomData<fn(D)>,
}

impl<K, V, D, F> StrongCache<K, V, D, F, RandomState>
where
    K: Eq + Hash + Clone,
    F: InstanceFactory<K, V, D>,
{
    /// Create a cache around `factory`.
    pub fn new(factory: F) -> Self {
        Self::with_hasher(factory, default_shard_count(), RandomState::new())
    }
}

impl<K, V, D, E, G> StrongCache<K, V, D, G, RandomState>
where
    K: Eq + Hash + Clone,
    G: Fn(&K, D) -> Result<Option<V>, E>,
{
    /// Create a cache around a constructor closure.
    pub fn from_fn(constructor: G) -> Self {
        Self::new(constructor)
    }
}

impl<K, V, D, F, S> StrongCache<K, V, D, F, S>
where
    K: Eq + Hash + Clone,
    F: InstanceFactory<K, V, D>,
    S: BuildHasher + Clone,
{
    /// Create a cache with an explicit shard count and hasher.
    pub fn with_hasher(factory: F, shards: usize, hasher: S) -> Self {
        Self {
            entries: SlotMap::with_hasher(shards, hasher),
            factory,
            counters: CacheCounters::default(),
            _data: PhantomData,
        }
    }

    /// Number of shards in the entry map.
    pub fn shard_count(&self) -> usize {
        self.entries.shard_count()
    }
}

impl<K, V, D, F, S> MemoizingCache<K, V, D> for StrongCache<K, V, D, F, S>
where
    K: Eq + Hash + Clone,
    F: InstanceFactory<K, V, D>,
    S: BuildHasher + Clone,
{
    type Error = F::Error;

    fn get_instance(&self, key: &K, data: D) -> Result<Option<Arc<V>>, Self::Error> {
        if let Some(entry) = self.entries.get(key) {
            match &entry {
                Some(_) => self.counters.inc_hit(),
                None => self.counters.inc_absent_hit(),
            }
            return Ok(entry);
        }

        self.counters.inc_miss();
        let value = match self.factory.create_instance(key, data) {
            Ok(value) => {
                self.counters.inc_create();
                value.map(Arc::new)
            },
            Err(err) => {
                self.counters.inc_failure();
                return Err(err);
            },
        };

        match self.entries.insert_if_absent(key.clone(), value.clone()) {
            None => {
                self.counters.inc_insert();
                Ok(value)
            },
            Some(winner) => {
                self.counters.inc_race_loss();
                tracing::trace!("race loser's value discarded");
                Ok(winner)
            },
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot(self.entries.len())
    }
}

impl<K, V, D, F, S> fmt::Debug for StrongCache<K, V, D, F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrongCache")
            .field("entries", &self.entries.len())
            .field("shards", &self.entries.shard_count())
            .finish_non_exhaustive()
    }
}
