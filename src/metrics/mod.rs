//! Per-cache counters and their snapshots.

pub(crate) mod counters;
pub mod snapshot;

pub use snapshot::CacheMetrics;
