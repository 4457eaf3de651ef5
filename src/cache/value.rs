//! Passive concurrent cache: get/put/clear without construction on miss.
//!
//! Each stored value is wrapped with the cache's reference policy at `put`
//! time, so under the soft or weak policy an entry can lose its value. Such
//! an entry reads as missing; the next `put` for that key replaces it.
//!
//! `clear` empties the whole map under every shard lock at once. A reader
//! that fetched a value before the clear keeps its `Arc` and may go on using
//! it until it looks the key up again.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use crate::metrics::CacheMetrics;
use crate::metrics::counters::CacheCounters;
use crate::reference::{PolicySource, ValueRef};
use crate::store::slot_map::{SlotMap, default_shard_count};
use crate::traits::PassiveCache;

/// Concurrent key/value store whose values follow a reference policy.
///
/// # Example
///
/// ```
/// use softcache::cache::value::ValueCache;
/// use softcache::reference::ReferencePolicy;
/// use softcache::traits::PassiveCache;
///
/// let cache = ValueCache::with_policy(ReferencePolicy::Strong);
/// cache.put("en_US", "gregorian");
/// assert_eq!(cache.get(&"en_US").as_deref(), Some(&"gregorian"));
///
/// cache.clear();
/// assert!(cache.get(&"en_US").is_none());
/// ```
pub struct ValueCache<K, V, S = RandomState> {
    entries: SlotMap<K, ValueRef<V>, S>,
    policy: PolicySource,
    counters: CacheCounters,
}

impl<K, V> ValueCache<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Create a cache that follows the global reference policy.
    pub fn new() -> Self {
        Self::with_options(PolicySource::Global, default_shard_count(), RandomState::new())
    }

    /// Create a cache that always uses `policy`.
    pub fn with_policy(policy: impl Into<PolicySource>) -> Self {
        Self::with_options(policy.into(), default_shard_count(), RandomState::new())
    }
}

impl<K, V> Default for ValueCache<K, V, RandomState>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ValueCache<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Create a cache with an explicit policy source, shard count and hasher.
    pub fn with_options(policy: PolicySource, shards: usize, hasher: S) -> Self {
        Self {
            entries: SlotMap::with_hasher(shards, hasher),
            policy,
            counters: CacheCounters::default(),
        }
    }

    /// Number of stored entries, including ones whose value was reclaimed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the cache's counters.
    pub fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot(self.entries.len())
    }
}

impl<K, V, S> PassiveCache<K, V> for ValueCache<K, V, S>
where
    K: Eq + Hash,
    V: Send + Sync + 'static,
    S: BuildHasher + Clone,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        let Some(handle) = self.entries.get(key) else {
            self.counters.inc_miss();
            return None;
        };
        match handle.get() {
            Some(value) => {
                self.counters.inc_hit();
                Some(value)
            },
            None => {
                self.counters.inc_reclaimed();
                None
            },
        }
    }

    fn put(&self, key: K, value: V) {
        let handle = self.policy.wrap(&Arc::new(value));
        self.entries.insert(key, handle);
        self.counters.inc_insert();
    }

    fn remove(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

impl<K, V, S> fmt::Debug for ValueCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCache")
            .field("entries", &self.entries.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
