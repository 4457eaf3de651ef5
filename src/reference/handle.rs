//! Reclaimable value handles.
//!
//! A [`ValueRef`] is the indirection a cache slot stores instead of the value
//! itself. Reading it yields the value or `None` once the value has been
//! reclaimed. The variant decides when reclamation may happen; see
//! [`ReferencePolicy`](crate::reference::ReferencePolicy).

use std::sync::{Arc, Weak};

use crate::reference::policy::ReferencePolicy;
use crate::reference::soft::SoftRef;

/// Handle to a cached value that may be reclaimed independently of the cache.
///
/// A handle never goes back from reclaimed to live. Once [`get`](Self::get)
/// returns `None`, the owner must build a new handle for a fresh value.
#[derive(Debug)]
pub enum ValueRef<V> {
    /// Keeps the value alive for as long as the handle exists.
    Strong(Arc<V>),
    /// Keeps the value alive until memory pressure releases an unshared value.
    Soft(SoftRef<V>),
    /// Never keeps the value alive on its own.
    Weak(Weak<V>),
}

impl<V> ValueRef<V> {
    /// Returns the value if it is still reachable.
    #[inline]
    pub fn get(&self) -> Option<Arc<V>> {
        match self {
            ValueRef::Strong(value) => Some(Arc::clone(value)),
            ValueRef::Soft(soft) => soft.get(),
            ValueRef::Weak(weak) => weak.upgrade(),
        }
    }

    /// Returns `true` if the value is gone and the handle is dead.
    pub fn is_reclaimed(&self) -> bool {
        match self {
            ValueRef::Strong(_) => false,
            ValueRef::Soft(soft) => soft.is_reclaimed(),
            ValueRef::Weak(weak) => weak.strong_count() == 0,
        }
    }

    /// Policy that produced this handle.
    pub fn policy(&self) -> ReferencePolicy {
        match self {
            ValueRef::Strong(_) => ReferencePolicy::Strong,
            ValueRef::Soft(_) => ReferencePolicy::Soft,
            ValueRef::Weak(_) => ReferencePolicy::Weak,
        }
    }
}

impl<V> Clone for ValueRef<V> {
    fn clone(&self) -> Self {
        match self {
            ValueRef::Strong(value) => ValueRef::Strong(Arc::clone(value)),
            ValueRef::Soft(soft) => ValueRef::Soft(soft.clone()),
            ValueRef::Weak(weak) => ValueRef::Weak(Weak::clone(weak)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_handle_is_never_reclaimed() {
        let handle = ReferencePolicy::Strong.wrap(&Arc::new(5_i32));
        assert_eq!(handle.get().as_deref(), Some(&5));
        assert!(!handle.is_reclaimed());
        assert_eq!(handle.policy(), ReferencePolicy::Strong);
    }

    #[test]
    fn weak_handle_dies_with_last_caller_reference() {
        let value = Arc::new(String::from("weak"));
        let handle = ReferencePolicy::Weak.wrap(&value);
        assert_eq!(handle.get().as_deref().map(String::as_str), Some("weak"));

        drop(value);

        assert!(handle.is_reclaimed());
        assert!(handle.get().is_none());
        assert_eq!(handle.policy(), ReferencePolicy::Weak);
    }

    #[test]
    fn soft_handle_reports_its_policy() {
        let value = Arc::new(1_u8);
        let handle = ReferencePolicy::Soft.wrap(&value);
        assert_eq!(handle.policy(), ReferencePolicy::Soft);
        assert_eq!(handle.get().as_deref(), Some(&1));
    }

    #[test]
    fn cloned_weak_handle_tracks_same_value() {
        let value = Arc::new(3_u16);
        let handle = ReferencePolicy::Weak.wrap(&value);
        let clone = handle.clone();

        drop(value);

        assert!(handle.get().is_none());
        assert!(clone.get().is_none());
    }
}
