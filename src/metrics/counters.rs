use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::CacheMetrics;

/// Relaxed atomic counters shared by every cache type.
///
/// Counters are observational only; no cache decision reads them.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    absent_hits: AtomicU64,
    misses: AtomicU64,
    creates: AtomicU64,
    recomputes: AtomicU64,
    failures: AtomicU64,
    race_losses: AtomicU64,
    adoptions: AtomicU64,
    inserts: AtomicU64,
    reclaimed: AtomicU64,
}

macro_rules! incr {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl CacheCounters {
    incr! {
        inc_hit => hits,
        inc_absent_hit => absent_hits,
        inc_miss => misses,
        inc_create => creates,
        inc_recompute => recomputes,
        inc_failure => failures,
        inc_race_loss => race_losses,
        inc_adoption => adoptions,
        inc_insert => inserts,
        inc_reclaimed => reclaimed,
    }

    /// Snapshot the counters together with the current slot count.
    pub(crate) fn snapshot(&self, slots: usize) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            absent_hits: self.absent_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            recomputes: self.recomputes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            race_losses: self.race_losses.load(Ordering::Relaxed),
            adoptions: self.adoptions.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            slots,
        }
    }
}
