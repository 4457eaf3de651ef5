//! softcache: thread-safe memoizing caches whose values can be reclaimed.
//!
//! A [`SoftCache`](cache::SoftCache) builds the value for a key on first
//! lookup and keeps it behind a reclaimable handle. If the value is later
//! reclaimed the next lookup rebuilds it transparently. Soft handles lose
//! their value only while no caller holds it: when the process goes over its
//! pin budget, or on an explicit reclamation pass. Weak handles lose it as
//! soon as the last caller `Arc` is dropped.
//!
//! ```text
//!   reference   ValueRef / SoftRef / ReferencePolicy registry
//!       ▲
//!   store       Slot (per-key cell) / SlotMap (sharded insert-if-absent)
//!       ▲
//!   cache       SoftCache / StrongCache / ValueCache
//! ```
//!
//! There is no size bound and no expiry: reclamation of unreferenced values
//! is the only way entries lose their value.
//!
//! ## Example
//!
//! ```
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use softcache::prelude::*;
//!
//! let cache = SoftCache::from_fn(|key: &String, _: ()| {
//!     Ok::<_, Infallible>((!key.is_empty()).then(|| key.to_uppercase()))
//! });
//!
//! let abc = cache.get_instance(&"abc".to_string(), ()).unwrap().unwrap();
//! assert_eq!(abc.as_str(), "ABC");
//!
//! // A cached "no value" is remembered too.
//! assert!(cache.get_instance(&String::new(), ()).unwrap().is_none());
//! assert!(cache.contains_key(&String::new()));
//!
//! // While a caller holds the value it survives reclamation.
//! reclaim_soft_references();
//! let again = cache.get_instance(&"abc".to_string(), ()).unwrap().unwrap();
//! assert!(Arc::ptr_eq(&abc, &again));
//! ```

pub mod builder;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod prelude;
pub mod reference;
pub mod store;
pub mod traits;
