//! Builder for every cache type in the crate.
//!
//! Collects the knobs a cache needs (shard count, reference policy source,
//! hasher) and hands them to the cache constructors.
//!
//! ## Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use softcache::builder::SoftCacheBuilder;
//! use softcache::reference::ReferencePolicy;
//! use softcache::traits::MemoizingCache;
//!
//! let cache = SoftCacheBuilder::new()
//!     .shards(8)
//!     .reference_policy(ReferencePolicy::Strong)
//!     .build_soft(|key: &u64, _: ()| Ok::<_, Infallible>(Some(key * 2)));
//!
//! assert_eq!(cache.get_instance(&21, ()).unwrap().as_deref(), Some(&42));
//! assert_eq!(cache.shard_count(), 8);
//! ```

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use crate::cache::soft::SoftCache;
use crate::cache::strong::StrongCache;
use crate::cache::value::ValueCache;
use crate::error::ConfigError;
use crate::reference::{PolicySource, ReferencePolicy};
use crate::store::slot_map::default_shard_count;
use crate::traits::InstanceFactory;

/// Builder for [`SoftCache`], [`StrongCache`] and [`ValueCache`].
///
/// Defaults: shard count derived from available parallelism, the global
/// reference policy, and `RandomState` hashing.
#[derive(Debug, Clone)]
pub struct SoftCacheBuilder<S = RandomState> {
    shards: Option<usize>,
    policy: PolicySource,
    hasher: S,
}

impl SoftCacheBuilder<RandomState> {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            shards: None,
            policy: PolicySource::Global,
            hasher: RandomState::new(),
        }
    }
}

impl Default for SoftCacheBuilder<RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SoftCacheBuilder<S>
where
    S: BuildHasher + Clone,
{
    /// Number of map shards. Zero is clamped to one by `build_*` and rejected
    /// by `try_build_*`.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Always use `policy`, ignoring the process-wide registry.
    ///
    /// Ignored by [`build_strong`](Self::build_strong).
    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = PolicySource::Fixed(policy);
        self
    }

    /// Follow the process-wide registry (the default).
    pub fn global_policy(mut self) -> Self {
        self.policy = PolicySource::Global;
        self
    }

    /// Use a custom hasher for key lookups.
    pub fn hasher<S2>(self, hasher: S2) -> SoftCacheBuilder<S2>
    where
        S2: BuildHasher + Clone,
    {
        SoftCacheBuilder {
            shards: self.shards,
            policy: self.policy,
            hasher,
        }
    }

    fn shard_count(&self) -> usize {
        self.shards.unwrap_or_else(default_shard_count)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.shards {
            Some(0) => Err(ConfigError::new("shard count must be > 0")),
            _ => Ok(()),
        }
    }

    /// Build a reclaimable memoizing cache around `factory`.
    pub fn build_soft<K, V, D, F>(self, factory: F) -> SoftCache<K, V, D, F, S>
    where
        K: Eq + Hash + Clone,
        V: Send + Sync + 'static,
        F: InstanceFactory<K, V, D>,
    {
        let shards = self.shard_count();
        SoftCache::with_options(factory, self.policy, shards, self.hasher)
    }

    /// Build a non-reclaiming memoizing cache around `factory`.
    pub fn build_strong<K, V, D, F>(self, factory: F) -> StrongCache<K, V, D, F, S>
    where
        K: Eq + Hash + Clone,
        F: InstanceFactory<K, V, D>,
    {
        let shards = self.shard_count();
        StrongCache::with_hasher(factory, shards, self.hasher)
    }

    /// Build a passive get/put cache.
    pub fn build_value<K, V>(self) -> ValueCache<K, V, S>
    where
        K: Eq + Hash,
    {
        let shards = self.shard_count();
        ValueCache::with_options(self.policy, shards, self.hasher)
    }

    /// Like [`build_soft`](Self::build_soft), rejecting invalid settings.
    pub fn try_build_soft<K, V, D, F>(self, factory: F) -> Result<SoftCache<K, V, D, F, S>, ConfigError>
    where
        K: Eq + Hash + Clone,
        V: Send + Sync + 'static,
        F: InstanceFactory<K, V, D>,
    {
        self.validate()?;
        Ok(self.build_soft(factory))
    }

    /// Like [`build_strong`](Self::build_strong), rejecting invalid settings.
    pub fn try_build_strong<K, V, D, F>(
        self,
        factory: F,
    ) -> Result<StrongCache<K, V, D, F, S>, ConfigError>
    where
        K: Eq + Hash + Clone,
        F: InstanceFactory<K, V, D>,
    {
        self.validate()?;
        Ok(self.build_strong(factory))
    }

    /// Like [`build_value`](Self::build_value), rejecting invalid settings.
    pub fn try_build_value<K, V>(self) -> Result<ValueCache<K, V, S>, ConfigError>
    where
        K: Eq + Hash,
    {
        self.validate()?;
        Ok(self.build_value())
    }
}
