/// Point-in-time copy of a cache's counters.
///
/// Memoizing caches fill the lookup and construction fields; the passive
/// [`ValueCache`](crate::cache::value::ValueCache) fills `hits`, `misses`,
/// `inserts` and `reclaimed`. `SoftCache` counts a slot found reclaimed on
/// recompute and on adoption. Fields a cache never touches stay zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,        // live value returned from an existing slot
    pub absent_hits: u64, // cached "no value" returned
    pub misses: u64,      // no slot existed for the key

    pub creates: u64,     // constructor invocations that returned
    pub recomputes: u64,  // constructions triggered by a reclaimed handle
    pub failures: u64,    // constructor invocations that failed

    pub race_losses: u64, // insert-if-absent found another thread's slot
    pub adoptions: u64,   // race loser's value adopted by a reclaimed winner

    pub inserts: u64,
    pub reclaimed: u64, // entries found whose value was already gone

    // gauge captured at snapshot time
    pub slots: usize,
}

impl CacheMetrics {
    /// Lookups that were answered without running the constructor.
    pub fn served_from_cache(&self) -> u64 {
        self.hits + self.absent_hits
    }
}
