//! Eager-resolve attribute names.
//!
//! Attribute names probed by reflection tooling before the caller commits to
//! using a value. Accessing one of these on a deferred handle resolves the
//! handle instead of deferring further.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Dunder attributes that reflection, validation and serialization tooling
/// reads off callables and types.
pub const INTROSPECTION_ATTRIBUTES: [&str; 17] = [
    "__annotations__",
    "__class__",
    "__closure__",
    "__code__",
    "__defaults__",
    "__dict__",
    "__doc__",
    "__func__",
    "__globals__",
    "__kwdefaults__",
    "__module__",
    "__name__",
    "__qualname__",
    "__self__",
    "__signature__",
    "__text_signature__",
    "__wrapped__",
];

/// Immutable set of names that force resolution on access.
///
/// Cheap to clone; every handle derived from a root shares the root's set.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EagerNames {
    names: Arc<HashSet<String>>,
}

impl EagerNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Arc::new(names.into_iter().map(Into::into).collect()),
        }
    }

    /// The standard dunder introspection set.
    pub fn introspection() -> Self {
        Self::new(INTROSPECTION_ATTRIBUTES)
    }

    /// Extend with additional names, returning a new set.
    pub fn with<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = (*self.names).clone();
        names.extend(extra.into_iter().map(Into::into));
        Self {
            names: Arc::new(names),
        }
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for EagerNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.names.iter().collect();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let names = EagerNames::default();
        assert!(names.is_empty());
        assert!(!names.contains("__doc__"));
    }

    #[test]
    fn test_introspection_set() {
        let names = EagerNames::introspection();
        assert_eq!(names.len(), INTROSPECTION_ATTRIBUTES.len());
        assert!(names.contains("__doc__"));
        assert!(names.contains("__wrapped__"));
        assert!(!names.contains("join"));
        assert!(!names.contains("__init__"));
    }

    #[test]
    fn test_with_extends_without_mutating() {
        let base = EagerNames::introspection();
        let extended = base.with(["model_fields"]);

        assert!(extended.contains("model_fields"));
        assert!(!base.contains("model_fields"));
        assert_eq!(extended.len(), base.len() + 1);
    }
}
