//! Reference policy and the process-wide policy registry.
//!
//! ## Architecture
//!
//! ```text
//!   set_reference_policy(Some(p)) ─┐
//!   override_reference_policy(p) ──┼──► POLICY: RwLock<Option<ReferencePolicy>>
//!   reset_reference_policy() ──────┘            │
//!                                               │ None = not yet initialised
//!                                               ▼
//!                                  reference_policy() ── lazily defaults from
//!                                               │        SOFTCACHE_REFERENCE_POLICY,
//!                                               │        else Soft
//!                                               ▼
//!   PolicySource::Global ──► wrap(&Arc<V>) ──► ValueRef<V>
//!   PolicySource::Fixed(p) ──► p.wrap(&Arc<V>) ──► ValueRef<V>
//! ```
//!
//! The policy is read when a handle is created. Changing it never touches
//! handles that already exist.
//!
//! ## Thread Safety
//!
//! The registry is a single global. Tests that install a different policy
//! must restore it afterwards; [`override_reference_policy`] returns a guard
//! that does so on drop.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ConfigError;
use crate::reference::handle::ValueRef;
use crate::reference::soft::SoftRef;

/// Environment variable consulted once when the registry is first read.
pub const POLICY_ENV_VAR: &str = "SOFTCACHE_REFERENCE_POLICY";

/// How a cache slot holds on to its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReferencePolicy {
    /// Pinned until memory pressure releases it while no caller holds it.
    #[default]
    Soft,
    /// Kept only while callers hold it.
    Weak,
    /// Never reclaimed.
    Strong,
}

impl ReferencePolicy {
    /// Builds a handle for `value` following this policy.
    pub fn wrap<V>(self, value: &Arc<V>) -> ValueRef<V>
    where
        V: Send + Sync + 'static,
    {
        match self {
            ReferencePolicy::Soft => ValueRef::Soft(SoftRef::new(value)),
            ReferencePolicy::Weak => ValueRef::Weak(Arc::downgrade(value)),
            ReferencePolicy::Strong => ValueRef::Strong(Arc::clone(value)),
        }
    }

    /// Returns `true` if values held under this policy can disappear.
    pub fn is_reclaimable(self) -> bool {
        !matches!(self, ReferencePolicy::Strong)
    }

    /// Lowercase name accepted by the `FromStr` impl.
    pub fn as_str(self) -> &'static str {
        match self {
            ReferencePolicy::Soft => "soft",
            ReferencePolicy::Weak => "weak",
            ReferencePolicy::Strong => "strong",
        }
    }

    fn from_env() -> Option<Self> {
        let raw = std::env::var(POLICY_ENV_VAR).ok()?;
        match raw.parse() {
            Ok(policy) => Some(policy),
            Err(err) => {
                tracing::warn!(
                    var = POLICY_ENV_VAR,
                    value = %raw,
                    error = %err,
                    "ignoring invalid reference policy"
                );
                None
            },
        }
    }
}

impl fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferencePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(ReferencePolicy::Soft),
            "weak" => Ok(ReferencePolicy::Weak),
            "strong" => Ok(ReferencePolicy::Strong),
            other => Err(ConfigError::new(format!(
                "unknown reference policy {other:?}, expected one of soft, weak, strong"
            ))),
        }
    }
}

/// Where a cache takes its reference policy from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolicySource {
    /// Read the process-wide registry each time a handle is created.
    #[default]
    Global,
    /// Always use this policy, ignoring the registry.
    Fixed(ReferencePolicy),
}

impl PolicySource {
    /// Policy that a handle created right now would use.
    #[inline]
    pub fn current(self) -> ReferencePolicy {
        match self {
            PolicySource::Global => reference_policy(),
            PolicySource::Fixed(policy) => policy,
        }
    }

    /// Builds a handle for `value` with the current policy.
    #[inline]
    pub fn wrap<V>(self, value: &Arc<V>) -> ValueRef<V>
    where
        V: Send + Sync + 'static,
    {
        self.current().wrap(value)
    }
}

impl From<ReferencePolicy> for PolicySource {
    fn from(policy: ReferencePolicy) -> Self {
        PolicySource::Fixed(policy)
    }
}

static POLICY: RwLock<Option<ReferencePolicy>> = RwLock::new(None);

/// Returns the installed policy, initialising the default on first use.
pub fn reference_policy() -> ReferencePolicy {
    if let Some(policy) = *POLICY.read() {
        return policy;
    }
    let mut slot = POLICY.write();
    *slot.get_or_insert_with(|| ReferencePolicy::from_env().unwrap_or_default())
}

fn swap_policy(policy: ReferencePolicy) -> ReferencePolicy {
    let mut slot = POLICY.write();
    let previous = slot.unwrap_or_else(|| ReferencePolicy::from_env().unwrap_or_default());
    *slot = Some(policy);
    previous
}

/// Installs `policy` for every handle created from now on.
///
/// Returns the policy that was installed before. Passing `None` fails with a
/// [`ConfigError`] and leaves the registry unchanged.
///
/// # Example
///
/// ```
/// use softcache::reference::{ReferencePolicy, reset_reference_policy, set_reference_policy};
///
/// set_reference_policy(Some(ReferencePolicy::Strong)).unwrap();
/// assert!(set_reference_policy(None).is_err());
/// reset_reference_policy();
/// ```
pub fn set_reference_policy(policy: Option<ReferencePolicy>) -> Result<ReferencePolicy, ConfigError> {
    let policy = policy.ok_or_else(|| ConfigError::new("reference policy must not be absent"))?;
    let previous = swap_policy(policy);
    tracing::debug!(%previous, current = %policy, "reference policy changed");
    Ok(previous)
}

/// Builds a handle for `value` with the installed policy.
pub fn wrap<V>(value: &Arc<V>) -> ValueRef<V>
where
    V: Send + Sync + 'static,
{
    reference_policy().wrap(value)
}

/// Restores the default policy ([`ReferencePolicy::Soft`]).
///
/// The environment is not consulted again.
pub fn reset_reference_policy() {
    *POLICY.write() = Some(ReferencePolicy::default());
    tracing::debug!("reference policy reset to default");
}

/// Installs `policy` until the returned guard is dropped.
#[must_use = "the previous policy is restored when the guard is dropped"]
pub fn override_reference_policy(policy: ReferencePolicy) -> PolicyOverride {
    let previous = swap_policy(policy);
    tracing::debug!(%previous, current = %policy, "reference policy overridden");
    PolicyOverride { previous }
}

/// Guard returned by [`override_reference_policy`].
#[derive(Debug)]
pub struct PolicyOverride {
    previous: ReferencePolicy,
}

impl PolicyOverride {
    /// Policy that will be restored on drop.
    pub fn previous(&self) -> ReferencePolicy {
        self.previous
    }
}

impl Drop for PolicyOverride {
    fn drop(&mut self) {
        *POLICY.write() = Some(self.previous);
        tracing::debug!(restored = %self.previous, "reference policy restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The registry itself is exercised in tests/reference_policy.rs, which
    // serializes access. Unit tests here stay away from the global.

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("soft".parse::<ReferencePolicy>(), Ok(ReferencePolicy::Soft));
        assert_eq!(" Weak ".parse::<ReferencePolicy>(), Ok(ReferencePolicy::Weak));
        assert_eq!("STRONG".parse::<ReferencePolicy>(), Ok(ReferencePolicy::Strong));
    }

    #[test]
    fn unknown_policy_name_is_rejected() {
        let err = "phantom".parse::<ReferencePolicy>().unwrap_err();
        assert!(err.message().contains("phantom"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for policy in [
            ReferencePolicy::Soft,
            ReferencePolicy::Weak,
            ReferencePolicy::Strong,
        ] {
            assert_eq!(policy.to_string().parse::<ReferencePolicy>(), Ok(policy));
        }
    }

    #[test]
    fn default_policy_is_soft() {
        assert_eq!(ReferencePolicy::default(), ReferencePolicy::Soft);
        assert_eq!(PolicySource::default(), PolicySource::Global);
    }

    #[test]
    fn fixed_source_ignores_registry() {
        let source = PolicySource::from(ReferencePolicy::Strong);
        assert_eq!(source.current(), ReferencePolicy::Strong);
        let handle = source.wrap(&Arc::new(9_u32));
        assert_eq!(handle.policy(), ReferencePolicy::Strong);
    }

    #[test]
    fn only_strong_is_not_reclaimable() {
        assert!(ReferencePolicy::Soft.is_reclaimable());
        assert!(ReferencePolicy::Weak.is_reclaimable());
        assert!(!ReferencePolicy::Strong.is_reclaimable());
    }
}
