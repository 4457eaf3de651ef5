pub use crate::builder::SoftCacheBuilder;
pub use crate::cache::{SoftCache, StrongCache, ValueCache};
pub use crate::error::ConfigError;
pub use crate::metrics::CacheMetrics;
pub use crate::reference::{
    PolicySource, ReferencePolicy, ValueRef, override_reference_policy, reclaim_soft_references,
    set_reference_policy, set_soft_reference_budget,
};
pub use crate::traits::{InstanceFactory, MemoizingCache, PassiveCache};
