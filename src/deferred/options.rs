//! Deferred handle configuration.

use super::eager::EagerNames;

/// Options shared by a root handle and every handle derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferOptions {
    /// Attribute names that resolve the handle instead of deferring.
    /// Default: the dunder introspection set.
    pub eager_names: EagerNames,
}

impl Default for DeferOptions {
    fn default() -> Self {
        Self::introspection()
    }
}

impl DeferOptions {
    /// Resolve on the standard introspection probes (`__doc__`, `__name__`, ...).
    pub fn introspection() -> Self {
        Self {
            eager_names: EagerNames::introspection(),
        }
    }

    /// Defer every attribute access; only explicit forcing operations resolve.
    pub fn transparent() -> Self {
        Self {
            eager_names: EagerNames::default(),
        }
    }

    /// Use a custom eager-name set.
    pub fn with_eager_names(eager_names: EagerNames) -> Self {
        Self { eager_names }
    }
}
