//! Error types for the softcache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a configuration value is invalid: an
//!   absent reference policy handed to the registry, an unknown policy name,
//!   or a builder parameter out of range.
//!
//! Construction failures are not represented here. They belong to the
//! caller's [`InstanceFactory`](crate::traits::InstanceFactory) and are
//! propagated unchanged.
//!
//! ## Example Usage
//!
//! ```
//! use softcache::error::ConfigError;
//! use softcache::reference::set_reference_policy;
//!
//! let err: ConfigError = set_reference_policy(None).unwrap_err();
//! assert!(err.to_string().contains("policy"));
//! ```

use std::fmt;

/// Error returned when configuration parameters are invalid.
///
/// Produced by [`set_reference_policy`](crate::reference::set_reference_policy)
/// when no policy is supplied, by the `FromStr` impl of
/// [`ReferencePolicy`](crate::reference::ReferencePolicy), and by the
/// builder's `try_build_*` methods. Carries a human-readable description of
/// which parameter failed validation.
///
/// # Example
///
/// ```
/// use softcache::builder::SoftCacheBuilder;
///
/// let err = SoftCacheBuilder::new().shards(0).try_build_value::<u64, u64>().unwrap_err();
/// assert!(err.to_string().contains("shard"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}
