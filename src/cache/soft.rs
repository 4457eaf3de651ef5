//! Memoizing cache whose values can be reclaimed and are rebuilt on demand.
//!
//! ## Architecture
//!
//! ```text
//!   get_instance(key, data)
//!        │
//!        ▼
//!   SlotMap::get(key) ───────── Some(slot) ──► lock slot
//!        │                                       ├─ absent marker   ──► Ok(None)
//!        │ None                                  ├─ live value      ──► Ok(Some(value))
//!        ▼                                       └─ reclaimed       ──► construct under slot lock,
//!   construct(key, data)   (no lock held)                               refill slot, return
//!        │
//!        ▼
//!   SlotMap::insert_if_absent(key, Slot::new(result))
//!        ├─ inserted ──► return result
//!        └─ lost race ──► winner.adopt_if_reclaimed(result)
//!                           ├─ winner absent    ──► Ok(None)
//!                           ├─ winner live      ──► winner's value (ours is dropped)
//!                           └─ winner reclaimed ──► our result fills the winner's slot
//! ```
//!
//! ## Key Components
//!
//! - [`SoftCache`]: the cache. Generic over key `K`, value `V`, construction
//!   input `D`, factory `F` and hasher `S`.
//!
//! ## Concurrency
//!
//! - Constructing a brand-new key holds no lock at all. Two threads missing
//!   the same key may both construct; exactly one slot ends up in the map and
//!   a live value in it is never replaced by a race loser's value.
//! - Recomputing after reclamation holds only that key's slot lock.
//! - Keys never contend on slot locks, and only briefly on shard locks.
//!
//! ## Example Usage
//!
//! ```
//! use std::convert::Infallible;
//! use softcache::cache::soft::SoftCache;
//! use softcache::traits::MemoizingCache;
//!
//! let cache = SoftCache::from_fn(|key: &String, _: ()| {
//!     Ok::<_, Infallible>((!key.is_empty()).then(|| key.to_uppercase()))
//! });
//!
//! assert_eq!(cache.get_instance(&"abc".to_string(), ()).unwrap().as_deref(), Some(&"ABC".to_string()));
//! assert_eq!(cache.get_instance(&String::new(), ()).unwrap(), None);
//! ```

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::metrics::CacheMetrics;
use crate::metrics::counters::CacheCounters;
use crate::reference::PolicySource;
use crate::store::slot::{Adoption, Refill, Slot};
use crate::store::slot_map::{SlotMap, default_shard_count};
use crate::traits::{InstanceFactory, MemoizingCache};

/// Thread-safe memoizing cache with reclaimable values.
///
/// Values are held through the reference policy chosen by the cache's
/// [`PolicySource`] (the process-wide registry by default). A value that has
/// been reclaimed is rebuilt on the next lookup of its key.
pub struct SoftCache<K, V, D, F, S = RandomState> {
    slots: SlotMap<K, Arc<Slot<V>>, S>,
    factory: F,
    policy: PolicySource,
    counters: CacheCounters,
    _data: PhantomData<fn(D)>,
}

impl<K, V, D, F> SoftCache<K, V, D, F, RandomState>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
    F: InstanceFactory<K, V, D>,
{
    /// Create a cache around `factory`, using the global reference policy.
    pub fn new(factory: F) -> Self {
        Self::with_options(
            factory,
            PolicySource::Global,
            default_shard_count(),
            RandomState::new(),
        )
    }
}

impl<K, V, D, E, G> SoftCache<K, V, D, G, RandomState>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
    G: Fn(&K, D) -> Result<Option<V>, E>,
{
    /// Create a cache around a constructor closure.
    pub fn from_fn(constructor: G) -> Self {
        Self::new(constructor)
    }
}

impl<K, V, D, F, S> SoftCache<K, V, D, F, S>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
    F: InstanceFactory<K, V, D>,
    S: BuildHasher + Clone,
{
    /// Create a cache with an explicit policy source, shard count and hasher.
    pub fn with_options(factory: F, policy: PolicySource, shards: usize, hasher: S) -> Self {
        Self {
            slots: SlotMap::with_hasher(shards, hasher),
            factory,
            policy,
            counters: CacheCounters::default(),
            _data: PhantomData,
        }
    }

    /// Policy source used when wrapping new values.
    pub fn policy_source(&self) -> PolicySource {
        self.policy
    }

    /// Number of shards in the slot map.
    pub fn shard_count(&self) -> usize {
        self.slots.shard_count()
    }

    /// The factory this cache constructs values with.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn construct(&self, key: &K, data: D) -> Result<Option<V>, F::Error> {
        match self.factory.create_instance(key, data) {
            Ok(value) => {
                self.counters.inc_create();
                Ok(value)
            },
            Err(err) => {
                self.counters.inc_failure();
                Err(err)
            },
        }
    }

    fn lookup_existing(&self, key: &K, slot: &Slot<V>, data: D) -> Result<Option<Arc<V>>, F::Error> {
        match slot.get_or_recompute(self.policy, || self.construct(key, data))? {
            Refill::Cached(Some(value)) => {
                self.counters.inc_hit();
                Ok(Some(value))
            },
            Refill::Cached(None) => {
                self.counters.inc_absent_hit();
                Ok(None)
            },
            Refill::Recomputed(value) => {
                self.counters.inc_reclaimed();
                self.counters.inc_recompute();
                tracing::trace!(present = value.is_some(), "recomputed reclaimed cache value");
                Ok(value)
            },
        }
    }

    fn insert_new(&self, key: &K, data: D) -> Result<Option<Arc<V>>, F::Error> {
        self.counters.inc_miss();
        let value = self.construct(key, data)?.map(Arc::new);

        let slot = Arc::new(Slot::new(value.as_ref(), self.policy));
        let Some(winner) = self.slots.insert_if_absent(key.clone(), slot) else {
            self.counters.inc_insert();
            return Ok(value);
        };

        self.counters.inc_race_loss();
        let adoption = winner.adopt_if_reclaimed(value, self.policy);
        match &adoption {
            Adoption::Adopted(_) => {
                self.counters.inc_reclaimed();
                self.counters.inc_adoption();
                tracing::trace!("race loser's value adopted by reclaimed slot");
            },
            Adoption::Kept(_) | Adoption::Absent => {
                tracing::trace!("race loser's value discarded");
            },
        }
        Ok(adoption.into_value())
    }
}

impl<K, V, D, F, S> MemoizingCache<K, V, D> for SoftCache<K, V, D, F, S>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
    F: InstanceFactory<K, V, D>,
    S: BuildHasher + Clone,
{
    type Error = F::Error;

    fn get_instance(&self, key: &K, data: D) -> Result<Option<Arc<V>>, Self::Error> {
        match self.slots.get(key) {
            Some(slot) => self.lookup_existing(key, &slot, data),
            None => self.insert_new(key, data),
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot(self.slots.len())
    }
}

impl<K, V, D, F, S> fmt::Debug for SoftCache<K, V, D, F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftCache")
            .field("slots", &self.slots.len())
            .field("shards", &self.slots.shard_count())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
