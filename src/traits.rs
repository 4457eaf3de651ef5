//! # Cache Trait Hierarchy
//!
//! Two families of caches share this crate: memoizing caches, which build a
//! missing value on demand, and passive caches, which only store what they
//! are given.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────┐
//!   │       InstanceFactory<K, V, D>       │   caller-supplied constructor
//!   │                                      │
//!   │  create_instance(&K, D)              │
//!   │      → Result<Option<V>, Error>      │
//!   └──────────────────┬───────────────────┘
//!                      │ invoked on miss / after reclamation
//!                      ▼
//!   ┌──────────────────────────────────────┐      ┌──────────────────────────────┐
//!   │       MemoizingCache<K, V, D>        │      │     PassiveCache<K, V>       │
//!   │                                      │      │                              │
//!   │  get_instance(&K, D)                 │      │  get(&K) → Option<Arc<V>>    │
//!   │      → Result<Option<Arc<V>>, Error> │      │  put(K, V)                   │
//!   │  contains_key(&K) → bool             │      │  remove(&K) → bool           │
//!   │  len() / is_empty()                  │      │  clear()                     │
//!   │  metrics() → CacheMetrics            │      │                              │
//!   └──────────────────┬───────────────────┘      └──────────────┬───────────────┘
//!                      │                                         │
//!          ┌───────────┴────────────┐                            ▼
//!          ▼                        ▼                       ValueCache
//!      SoftCache               StrongCache
//!  (reclaimable values)   (values never dropped)
//! ```
//!
//! ## Trait Summary
//!
//! | Trait             | Purpose                                             |
//! |-------------------|-----------------------------------------------------|
//! | `InstanceFactory` | Builds the value for a key from construction input  |
//! | `MemoizingCache`  | Look up or construct, one authoritative slot per key|
//! | `PassiveCache`    | Plain get/put/clear storage, no construction        |
//!
//! ## Closures as factories
//!
//! Any `Fn(&K, D) -> Result<Option<V>, E>` is an [`InstanceFactory`]. Returning
//! `Ok(None)` means "no value exists for this key", which is cached like any
//! other result. Returning `Err` is never cached.

use std::sync::Arc;

use crate::metrics::CacheMetrics;

/// Builds the value for a key.
///
/// Construction is expected to be referentially transparent for a given key:
/// under a race, two constructions may run for the same key and only one
/// result is kept.
///
/// # Example
///
/// ```
/// use softcache::traits::InstanceFactory;
///
/// struct Upper;
///
/// impl InstanceFactory<String, String, ()> for Upper {
///     type Error = std::convert::Infallible;
///
///     fn create_instance(&self, key: &String, _data: ()) -> Result<Option<String>, Self::Error> {
///         Ok((!key.is_empty()).then(|| key.to_uppercase()))
///     }
/// }
///
/// assert_eq!(Upper.create_instance(&"abc".to_string(), ()), Ok(Some("ABC".to_string())));
/// assert_eq!(Upper.create_instance(&String::new(), ()), Ok(None));
/// ```
pub trait InstanceFactory<K, V, D> {
    /// Failure raised by construction. Propagated to the caller, never cached.
    type Error;

    /// Builds the value for `key` from `data`. `Ok(None)` means "no value".
    fn create_instance(&self, key: &K, data: D) -> Result<Option<V>, Self::Error>;
}

impl<K, V, D, E, F> InstanceFactory<K, V, D> for F
where
    F: Fn(&K, D) -> Result<Option<V>, E>,
{
    type Error = E;

    #[inline]
    fn create_instance(&self, key: &K, data: D) -> Result<Option<V>, E> {
        self(key, data)
    }
}

/// A cache that constructs values on demand and remembers the result.
///
/// For every key at most one slot ever exists. A cached "no value" is
/// returned on every later lookup without calling the constructor again.
pub trait MemoizingCache<K, V, D> {
    /// Failure raised by the cache's constructor.
    type Error;

    /// Returns the cached result for `key`, constructing it from `data` if
    /// there is none or the previous value was reclaimed.
    ///
    /// `data` is only used when construction happens.
    fn get_instance(&self, key: &K, data: D) -> Result<Option<Arc<V>>, Self::Error>;

    /// Returns `true` if a result was ever produced for `key`.
    fn contains_key(&self, key: &K) -> bool;

    /// Number of keys with a slot.
    fn len(&self) -> usize;

    /// Returns `true` if no result was ever produced.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache's counters.
    fn metrics(&self) -> CacheMetrics;
}

/// Plain concurrent storage without construction on miss.
pub trait PassiveCache<K, V> {
    /// Returns the stored value, or `None` if missing or reclaimed.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn put(&self, key: K, value: V);

    /// Removes the entry for `key`. Returns `true` if one existed.
    fn remove(&self, key: &K) -> bool;

    /// Removes every entry.
    fn clear(&self);
}
