//! Reclaimable references and the policy that chooses between them.
//!
//! ## Key Components
//!
//! - [`ValueRef`]: the handle a cache slot stores in place of its value.
//! - [`ReferencePolicy`]: `Soft` (default), `Weak` or `Strong`.
//! - [`PolicySource`]: per-cache choice between the global registry and a
//!   fixed policy.
//! - [`SoftRef`], [`reclaim_soft_references`] and the pin budget
//!   ([`set_soft_reference_budget`]): emulated memory-pressure reclamation.
//!
//! Exact reclamation timing is unspecified. Values nobody else holds lose
//! their pin once the process goes over its pin budget. Tests force it with
//! [`reclaim_soft_references`] or by dropping every caller-held `Arc` of a
//! weakly held value.

pub mod handle;
pub mod policy;
pub mod soft;

pub use handle::ValueRef;
pub use policy::{
    POLICY_ENV_VAR, PolicyOverride, PolicySource, ReferencePolicy, override_reference_policy,
    reference_policy, reset_reference_policy, set_reference_policy, wrap,
};
pub use soft::{
    DEFAULT_SOFT_BUDGET, SOFT_BUDGET_ENV_VAR, SoftRef, live_soft_references, pinned_soft_references,
    reclaim_soft_references, set_soft_reference_budget, soft_reference_budget,
};
