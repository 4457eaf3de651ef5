//! Settable per-key slot.
//!
//! A [`Slot`] is created once per key and lives as long as its cache. What
//! changes is its content: either the cached-absent marker or a
//! [`ValueRef`] that may lose its value to reclamation. When that happens
//! the slot is refilled in place rather than replaced in the map, because
//! insert-if-absent never overwrites an existing entry.
//!
//! Every read and write goes through a per-slot mutex, so work on one key
//! never blocks another.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reference::{PolicySource, ValueRef};

enum SlotState<V> {
    /// The cached result for this key is "no value".
    Absent,
    /// A value is or was cached.
    Held(ValueRef<V>),
}

impl<V> SlotState<V>
where
    V: Send + Sync + 'static,
{
    fn from_result(value: Option<&Arc<V>>, policy: PolicySource) -> Self {
        match value {
            Some(value) => SlotState::Held(policy.wrap(value)),
            None => SlotState::Absent,
        }
    }
}

/// What a slot held when it was read.
#[derive(Debug)]
pub enum SlotRead<V> {
    /// The cached result is "no value".
    Absent,
    /// A live value.
    Live(Arc<V>),
    /// The value was reclaimed; the handle is dead.
    Reclaimed,
}

/// Outcome of [`Slot::get_or_recompute`].
#[derive(Debug)]
pub enum Refill<V> {
    /// Served from the slot without calling the constructor.
    Cached(Option<Arc<V>>),
    /// The previous value had been reclaimed and was recomputed.
    Recomputed(Option<Arc<V>>),
}

impl<V> Refill<V> {
    /// The value handed back to the caller.
    pub fn into_value(self) -> Option<Arc<V>> {
        match self {
            Refill::Cached(value) | Refill::Recomputed(value) => value,
        }
    }
}

/// Outcome of [`Slot::adopt_if_reclaimed`].
#[derive(Debug)]
pub enum Adoption<V> {
    /// The slot caches "no value"; the candidate was ignored.
    Absent,
    /// The slot still had a live value; the candidate was ignored.
    Kept(Arc<V>),
    /// The slot's value was gone; the candidate now fills the slot.
    Adopted(Option<Arc<V>>),
}

impl<V> Adoption<V> {
    /// The value handed back to the caller.
    pub fn into_value(self) -> Option<Arc<V>> {
        match self {
            Adoption::Absent => None,
            Adoption::Kept(value) => Some(value),
            Adoption::Adopted(value) => value,
        }
    }
}

/// Mutable per-key cell holding a reclaimable handle or the absent marker.
pub struct Slot<V> {
    state: Mutex<SlotState<V>>,
}

impl<V> Slot<V>
where
    V: Send + Sync + 'static,
{
    /// Create a slot caching `value` (`None` caches "no value").
    pub fn new(value: Option<&Arc<V>>, policy: PolicySource) -> Self {
        Self {
            state: Mutex::new(SlotState::from_result(value, policy)),
        }
    }

    /// Read the slot without recomputing anything.
    pub fn read(&self) -> SlotRead<V> {
        match &*self.state.lock() {
            SlotState::Absent => SlotRead::Absent,
            SlotState::Held(handle) => match handle.get() {
                Some(value) => SlotRead::Live(value),
                None => SlotRead::Reclaimed,
            },
        }
    }

    /// Return the cached result, recomputing it if the value was reclaimed.
    ///
    /// `construct` runs while this slot is locked, so concurrent lookups of
    /// the same key wait for it instead of constructing again. If it fails
    /// the slot keeps its dead handle and the error is returned, so the next
    /// lookup retries.
    pub fn get_or_recompute<E>(
        &self,
        policy: PolicySource,
        construct: impl FnOnce() -> Result<Option<V>, E>,
    ) -> Result<Refill<V>, E> {
        let mut state = self.state.lock();
        let handle = match &*state {
            SlotState::Absent => return Ok(Refill::Cached(None)),
            SlotState::Held(handle) => handle,
        };
        if let Some(value) = handle.get() {
            return Ok(Refill::Cached(Some(value)));
        }

        let value = construct()?.map(Arc::new);
        *state = SlotState::from_result(value.as_ref(), policy);
        Ok(Refill::Recomputed(value))
    }

    /// Offer `candidate` as a replacement for a reclaimed value.
    ///
    /// Used by the loser of an insert race. The candidate is taken only if
    /// this slot's value is gone; a live value or the absent marker wins.
    pub fn adopt_if_reclaimed(
        &self,
        candidate: Option<Arc<V>>,
        policy: PolicySource,
    ) -> Adoption<V> {
        let mut state = self.state.lock();
        let handle = match &*state {
            SlotState::Absent => return Adoption::Absent,
            SlotState::Held(handle) => handle,
        };
        if let Some(existing) = handle.get() {
            return Adoption::Kept(existing);
        }

        *state = SlotState::from_result(candidate.as_ref(), policy);
        Adoption::Adopted(candidate)
    }
}

impl<V> std::fmt::Debug for Slot<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.lock() {
            SlotState::Absent => "absent",
            SlotState::Held(handle) if handle.is_reclaimed() => "reclaimed",
            SlotState::Held(_) => "live",
        };
        f.debug_struct("Slot").field("state", &state).finish()
    }
}
