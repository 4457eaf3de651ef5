//! Cache implementations.
//!
//! | Cache         | Construction on miss | Values reclaimable | Entry type            |
//! |---------------|----------------------|--------------------|-----------------------|
//! | `SoftCache`   | yes                  | per policy         | `Arc<Slot<V>>`        |
//! | `StrongCache` | yes                  | never              | `Option<Arc<V>>`      |
//! | `ValueCache`  | no                   | per policy         | `ValueRef<V>`         |

pub mod soft;
pub mod strong;
pub mod value;

pub use soft::SoftCache;
pub use strong::StrongCache;
pub use value::ValueCache;
