//! Storage building blocks shared by the caches.
//!
//! - [`slot_map`]: sharded concurrent map with insert-if-absent.
//! - [`slot`]: the per-key settable cell of [`SoftCache`](crate::cache::SoftCache).

pub mod slot;
pub mod slot_map;

pub use slot::Slot;
pub use slot_map::SlotMap;
