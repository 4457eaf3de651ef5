//! Soft references: values pinned until memory pressure releases them.
//!
//! A [`SoftRef`] holds a strong `Arc<V>` (the pin) alongside a `Weak<V>`.
//! Releasing the pin leaves the value alive only while some caller still
//! holds an `Arc` to it, which mirrors a runtime collector clearing
//! softly-reachable objects. A pin is only ever released while nothing else
//! holds the value, so a value in use is never dropped out from under a
//! later lookup.
//!
//! Pressure comes from two places:
//!
//! - **Pin budget.** The process-wide registry keeps at most
//!   [`soft_reference_budget`] pins. When registering a new soft reference
//!   pushes the count over budget, a clock sweep un-pins the coldest
//!   unshared values. No caller has to do anything.
//! - **Explicit pass.** [`reclaim_soft_references`] releases every unshared
//!   pin at once.
//!
//! ```text
//!   SoftRef::new(&arc)          budget sweep / reclaim pass       last caller Arc dropped
//!   ┌──────────────────┐        (only when unshared)              ┌──────────────────┐
//!   │ strong: Some(arc)│ ─────────────────────────────────────────► │ strong: None     │
//!   │ weak:   live     │                                           │ weak:   dead     │
//!   └──────────────────┘                                           └──────────────────┘
//!        get() = Some                                                  get() = None (final)
//! ```
//!
//! ## Clock Sweep
//!
//! ```text
//!   refs: [A ref=1] [B ref=0, shared] [C ref=0] [D unpinned] ...
//!           ▲ hand
//!
//!   A ref=1     -> clear ref, advance
//!   B shared    -> caller holds it, advance
//!   C ref=0     -> victim, advance
//!   D unpinned  -> nothing left to release, drop from the registry
//! ```
//!
//! `get` on a pinned reference sets its referenced bit, granting a second
//! chance. The sweep visits at most two laps of the registry.
//!
//! The registry holds only `Weak` pointers to the cells, so dropping a
//! `SoftRef` needs no bookkeeping. Values are released after the registry
//! lock is dropped, so a value's `Drop` may create new soft references.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::ConfigError;

/// Environment variable consulted once for the initial pin budget.
pub const SOFT_BUDGET_ENV_VAR: &str = "SOFTCACHE_SOFT_BUDGET";

/// Pin budget used when none is configured.
pub const DEFAULT_SOFT_BUDGET: usize = 16_384;

/// Smallest registry length that triggers an opportunistic prune.
const MIN_PRUNE_THRESHOLD: usize = 64;

// Cells currently holding their strong half.
static PINNED: AtomicUsize = AtomicUsize::new(0);

trait Reclaim: Send + Sync {
    /// Drops the pin if nothing else holds the value. Returns `true` if it did.
    fn reclaim(&self) -> bool;

    fn is_pinned(&self) -> bool;

    /// Pinned and held by nobody but the pin.
    fn is_evictable(&self) -> bool;

    /// Clears the referenced bit, returning its previous state.
    fn take_referenced(&self) -> bool;
}

struct SoftCell<V> {
    strong: Mutex<Option<Arc<V>>>,
    weak: Weak<V>,
    referenced: AtomicBool,
}

impl<V> SoftCell<V> {
    fn new(value: &Arc<V>) -> Self {
        PINNED.fetch_add(1, Ordering::Relaxed);
        Self {
            strong: Mutex::new(Some(Arc::clone(value))),
            weak: Arc::downgrade(value),
            referenced: AtomicBool::new(false),
        }
    }
}

impl<V: Send + Sync> Reclaim for SoftCell<V> {
    fn reclaim(&self) -> bool {
        let released = {
            let mut strong = self.strong.lock();
            match strong.as_ref() {
                Some(value) if Arc::strong_count(value) == 1 => strong.take(),
                _ => None,
            }
        };
        match released {
            Some(value) => {
                PINNED.fetch_sub(1, Ordering::Relaxed);
                drop(value);
                true
            },
            None => false,
        }
    }

    fn is_pinned(&self) -> bool {
        self.strong.lock().is_some()
    }

    fn is_evictable(&self) -> bool {
        self.strong
            .lock()
            .as_ref()
            .is_some_and(|value| Arc::strong_count(value) == 1)
    }

    fn take_referenced(&self) -> bool {
        self.referenced.swap(false, Ordering::Relaxed)
    }
}

impl<V> Drop for SoftCell<V> {
    fn drop(&mut self) {
        if self.strong.get_mut().is_some() {
            PINNED.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

/// Cells picked by one sweep. Released outside the registry lock.
#[must_use]
struct Sweep {
    victims: Vec<Arc<dyn Reclaim>>,
    visited: Vec<Arc<dyn Reclaim>>,
}

impl Sweep {
    fn release(self) -> usize {
        let released = self.victims.iter().filter(|cell| cell.reclaim()).count();
        drop(self.visited);
        released
    }
}

struct SoftRefRegistry {
    refs: Vec<Weak<dyn Reclaim>>,
    prune_at: usize,
    hand: usize,
    budget: Option<usize>,
}

impl SoftRefRegistry {
    const fn new() -> Self {
        Self {
            refs: Vec::new(),
            prune_at: MIN_PRUNE_THRESHOLD,
            hand: 0,
            budget: None,
        }
    }

    fn register(&mut self, cell: Weak<dyn Reclaim>) {
        if self.refs.len() >= self.prune_at {
            self.refs.retain(|entry| entry.strong_count() > 0);
            self.prune_at = (self.refs.len() * 2).max(MIN_PRUNE_THRESHOLD);
            self.hand = self.hand.min(self.refs.len());
        }
        self.refs.push(cell);
    }

    fn budget(&mut self) -> usize {
        *self.budget.get_or_insert_with(budget_from_env)
    }

    /// Number of pins above budget, if any.
    fn excess(&mut self) -> Option<usize> {
        let budget = self.budget();
        PINNED
            .load(Ordering::Relaxed)
            .checked_sub(budget)
            .filter(|excess| *excess > 0)
    }

    /// Advances the clock hand until `excess` victims are found or two laps
    /// have been made.
    fn sweep(&mut self, excess: usize) -> Sweep {
        let mut sweep = Sweep {
            victims: Vec::with_capacity(excess),
            visited: Vec::new(),
        };
        let mut steps = self.refs.len() * 2;
        while sweep.victims.len() < excess && steps > 0 && !self.refs.is_empty() {
            steps -= 1;
            if self.hand >= self.refs.len() {
                self.hand = 0;
            }
            let Some(cell) = self.refs[self.hand].upgrade() else {
                self.refs.swap_remove(self.hand);
                continue;
            };
            if !cell.is_pinned() {
                self.refs.swap_remove(self.hand);
                sweep.visited.push(cell);
                continue;
            }
            self.hand += 1;
            if !cell.take_referenced() && cell.is_evictable() {
                sweep.victims.push(cell);
            } else {
                sweep.visited.push(cell);
            }
        }
        sweep
    }

    fn drain_live(&mut self) -> Vec<Arc<dyn Reclaim>> {
        let mut live = Vec::with_capacity(self.refs.len());
        self.refs.retain(|entry| match entry.upgrade() {
            Some(cell) if cell.is_pinned() => {
                live.push(cell);
                true
            },
            Some(cell) => {
                live.push(cell);
                false
            },
            None => false,
        });
        self.prune_at = (self.refs.len() * 2).max(MIN_PRUNE_THRESHOLD);
        self.hand = self.hand.min(self.refs.len());
        live
    }
}

fn budget_from_env() -> usize {
    let Ok(raw) = std::env::var(SOFT_BUDGET_ENV_VAR) else {
        return DEFAULT_SOFT_BUDGET;
    };
    match parse_budget(&raw) {
        Ok(budget) => budget,
        Err(err) => {
            tracing::warn!(
                var = SOFT_BUDGET_ENV_VAR,
                value = %raw,
                error = %err,
                "ignoring invalid soft reference budget"
            );
            DEFAULT_SOFT_BUDGET
        },
    }
}

fn parse_budget(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::new("soft reference budget must be > 0")),
        Ok(budget) => Ok(budget),
        Err(err) => Err(ConfigError::new(format!(
            "invalid soft reference budget {raw:?}: {err}"
        ))),
    }
}

static SOFT_REFS: Mutex<SoftRefRegistry> = Mutex::new(SoftRefRegistry::new());

/// A reference that keeps its value alive until memory pressure releases it.
///
/// Cloning a `SoftRef` shares the same cell: releasing the pin affects every
/// clone.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use softcache::reference::{SoftRef, reclaim_soft_references};
///
/// let soft = SoftRef::new(&Arc::new(String::from("cached")));
/// assert_eq!(soft.get().as_deref().map(String::as_str), Some("cached"));
///
/// reclaim_soft_references();
/// assert!(soft.get().is_none());
/// ```
pub struct SoftRef<V> {
    cell: Arc<SoftCell<V>>,
}

impl<V> SoftRef<V>
where
    V: Send + Sync + 'static,
{
    /// Creates a soft reference to `value` and registers it for reclamation.
    ///
    /// If the process is now over its pin budget, cold unshared values are
    /// un-pinned before this returns.
    pub fn new(value: &Arc<V>) -> Self {
        let cell = Arc::new(SoftCell::new(value));
        let erased: Weak<dyn Reclaim> = Arc::downgrade(&cell) as Weak<dyn Reclaim>;
        let sweep = {
            let mut refs = SOFT_REFS.lock();
            refs.register(erased);
            refs.excess().map(|excess| refs.sweep(excess))
        };
        if let Some(sweep) = sweep {
            let released = sweep.release();
            tracing::trace!(released, "soft reference budget sweep");
        }
        Self { cell }
    }
}

impl<V> SoftRef<V> {
    /// Returns the value if it has not been reclaimed.
    pub fn get(&self) -> Option<Arc<V>> {
        if let Some(value) = self.cell.strong.lock().as_ref() {
            self.cell.referenced.store(true, Ordering::Relaxed);
            return Some(Arc::clone(value));
        }
        self.cell.weak.upgrade()
    }

    /// Returns `true` once the value is gone for good.
    pub fn is_reclaimed(&self) -> bool {
        self.cell.strong.lock().is_none() && self.cell.weak.strong_count() == 0
    }

    /// Returns `true` if the strong half is still held.
    pub fn is_pinned(&self) -> bool {
        self.cell.strong.lock().is_some()
    }
}

impl<V> Clone for SoftRef<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V> std::fmt::Debug for SoftRef<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftRef")
            .field("pinned", &self.is_pinned())
            .field("reclaimed", &self.is_reclaimed())
            .finish()
    }
}

/// Releases the pin of every soft reference whose value nobody else holds.
///
/// Values held by a caller stay pinned. Returns the number of values
/// released.
///
/// The registry lock is released before any value is dropped, so a value's
/// `Drop` impl may freely create new soft references.
pub fn reclaim_soft_references() -> usize {
    let live = SOFT_REFS.lock().drain_live();
    let released = live.iter().filter(|cell| cell.reclaim()).count();
    tracing::debug!(
        registered = live.len(),
        released,
        "reclaimed soft references"
    );
    released
}

/// Number of soft references the reclaimer still tracks (alive and not yet
/// known to be released).
pub fn live_soft_references() -> usize {
    SOFT_REFS
        .lock()
        .refs
        .iter()
        .filter(|entry| entry.strong_count() > 0)
        .count()
}

/// Number of soft references currently pinning their value.
pub fn pinned_soft_references() -> usize {
    PINNED.load(Ordering::Relaxed)
}

/// Maximum number of pinned soft references, process-wide.
///
/// Read from `SOFTCACHE_SOFT_BUDGET` on first use, else
/// [`DEFAULT_SOFT_BUDGET`].
pub fn soft_reference_budget() -> usize {
    SOFT_REFS.lock().budget()
}

/// Installs a new pin budget and returns the previous one.
///
/// A budget of zero fails with a [`ConfigError`]. Lowering the budget below
/// the current pin count sweeps immediately.
pub fn set_soft_reference_budget(budget: usize) -> Result<usize, ConfigError> {
    if budget == 0 {
        return Err(ConfigError::new("soft reference budget must be > 0"));
    }
    let (previous, sweep) = {
        let mut refs = SOFT_REFS.lock();
        let previous = refs.budget();
        refs.budget = Some(budget);
        (previous, refs.excess().map(|excess| refs.sweep(excess)))
    };
    tracing::debug!(previous, current = budget, "soft reference budget changed");
    if let Some(sweep) = sweep {
        sweep.release();
    }
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Other tests in this binary may run a reclamation pass at any time, so
    // assertions about pinning hold a caller Arc or run a pass themselves.

    fn cell<V: Send + Sync + 'static>(value: &Arc<V>) -> Arc<SoftCell<V>> {
        Arc::new(SoftCell::new(value))
    }

    fn erased<V: Send + Sync + 'static>(cell: &Arc<SoftCell<V>>) -> Weak<dyn Reclaim> {
        Arc::downgrade(cell) as Weak<dyn Reclaim>
    }

    #[test]
    fn soft_ref_returns_value_before_reclaim() {
        let value = Arc::new(7_u32);
        let soft = SoftRef::new(&value);
        assert_eq!(soft.get().as_deref(), Some(&7));
    }

    #[test]
    fn soft_ref_stays_pinned_while_caller_holds_value() {
        let value = Arc::new(String::from("held"));
        let soft = SoftRef::new(&value);

        reclaim_soft_references();

        assert!(soft.is_pinned());
        assert!(!soft.is_reclaimed());
        assert_eq!(soft.get().as_deref().map(String::as_str), Some("held"));
    }

    #[test]
    fn soft_ref_is_dead_after_reclaim_and_drop() {
        let soft = SoftRef::new(&Arc::new(vec![1_u8, 2, 3]));

        reclaim_soft_references();

        assert!(soft.is_reclaimed());
        assert!(soft.get().is_none());
        // Permanently dead: a second pass does not bring it back.
        reclaim_soft_references();
        assert!(soft.get().is_none());
    }

    #[test]
    fn clones_share_reclamation_state() {
        let soft = SoftRef::new(&Arc::new(1_u64));
        let clone = soft.clone();

        reclaim_soft_references();

        assert!(soft.get().is_none());
        assert!(clone.get().is_none());
    }

    #[test]
    fn dropped_soft_refs_are_pruned_from_registry() {
        let mut registry = SoftRefRegistry::new();
        let kept = cell(&Arc::new(0_u8));
        registry.register(erased(&kept));
        for _ in 0..(MIN_PRUNE_THRESHOLD * 2) {
            let dropped = cell(&Arc::new(1_u8));
            registry.register(erased(&dropped));
        }

        assert!(registry.refs.len() <= MIN_PRUNE_THRESHOLD + 1);
        let live = registry.drain_live();
        assert_eq!(live.len(), 1);
        assert_eq!(registry.refs.len(), 1);
    }

    #[test]
    fn sweep_skips_values_held_by_callers() {
        let mut registry = SoftRefRegistry::new();
        let held_value = Arc::new(1_u32);
        let held = cell(&held_value);
        let cold_a = cell(&Arc::new(2_u32));
        let cold_b = cell(&Arc::new(3_u32));
        for entry in [&held, &cold_a, &cold_b] {
            registry.register(erased(entry));
        }

        assert_eq!(registry.sweep(2).release(), 2);

        assert!(held.is_pinned());
        assert!(!cold_a.is_pinned());
        assert!(!cold_b.is_pinned());
    }

    #[test]
    fn sweep_gives_referenced_values_a_second_chance() {
        let mut registry = SoftRefRegistry::new();
        let hot = cell(&Arc::new(1_u32));
        let cold = cell(&Arc::new(2_u32));
        hot.referenced.store(true, Ordering::Relaxed);
        registry.register(erased(&hot));
        registry.register(erased(&cold));

        assert_eq!(registry.sweep(1).release(), 1);
        assert!(hot.is_pinned());
        assert!(!cold.is_pinned());

        // The hot bit was spent on the first lap.
        assert_eq!(registry.sweep(1).release(), 1);
        assert!(!hot.is_pinned());
    }

    #[test]
    fn sweep_drops_released_and_dead_entries() {
        let mut registry = SoftRefRegistry::new();
        let released = cell(&Arc::new(1_u32));
        assert!(released.reclaim());
        registry.register(erased(&released));
        registry.register(erased(&cell(&Arc::new(2_u32))));

        assert_eq!(registry.sweep(1).release(), 0);
        assert!(registry.refs.is_empty());
    }

    #[test]
    fn zero_or_garbage_budget_is_rejected() {
        assert!(parse_budget("0").is_err());
        assert!(parse_budget("lots").is_err());
        assert_eq!(parse_budget(" 128 "), Ok(128));
        assert!(set_soft_reference_budget(0).is_err());
    }
}
