//! Resolution errors.

use std::fmt;

use crate::runtime::{CallError, LoadError};

/// Result type for forcing operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Coarse failure category, independent of which operation produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Attribute,
    Call,
}

/// Errors surfaced by forcing a deferred handle or a dispatch hook.
///
/// Every message carries the full dotted path involved. None of these are
/// cached: the operation that produced one may simply be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A module could not be loaded.
    Import { module: String, source: LoadError },
    /// The attribute chain broke at `attribute_path` (the prefix walked so far).
    MissingAttribute { module: String, attribute_path: String },
    /// An eager attribute is absent from the resolved value.
    MissingIntrospection { path: String, attribute: String },
    /// A dispatch hook has no entry for `attribute`.
    UnknownExport { owner: String, attribute: String },
    /// The resolved value rejected an attribute write.
    ReadOnly { path: String, attribute: String },
    /// Raised by the resolved callee. Displayed exactly as the callee reported it.
    Call(CallError),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Import { .. } => ErrorKind::Import,
            ResolveError::MissingAttribute { .. }
            | ResolveError::MissingIntrospection { .. }
            | ResolveError::UnknownExport { .. }
            | ResolveError::ReadOnly { .. } => ErrorKind::Attribute,
            ResolveError::Call(_) => ErrorKind::Call,
        }
    }

    pub fn is_import(&self) -> bool {
        self.kind() == ErrorKind::Import
    }

    pub fn is_attribute(&self) -> bool {
        self.kind() == ErrorKind::Attribute
    }

    pub(crate) fn import(module: impl Into<String>, source: LoadError) -> Self {
        ResolveError::Import {
            module: module.into(),
            source,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Import { module, source } => {
                write!(f, "lateimport: cannot import module '{}': {}", module, source)
            }
            ResolveError::MissingAttribute {
                module,
                attribute_path,
            } => write!(
                f,
                "lateimport: module '{}' has no attribute path '{}'",
                module, attribute_path
            ),
            ResolveError::MissingIntrospection { path, attribute } => write!(
                f,
                "lateimport: attribute '{}' not found on '{}'",
                attribute, path
            ),
            ResolveError::UnknownExport { owner, attribute } => {
                write!(f, "module '{}' has no attribute '{}'", owner, attribute)
            }
            ResolveError::ReadOnly { path, attribute } => write!(
                f,
                "lateimport: cannot set attribute '{}' on '{}'",
                attribute, path
            ),
            ResolveError::Call(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Import { source, .. } => Some(source),
            ResolveError::Call(err) => std::error::Error::source(err),
            _ => None,
        }
    }
}

impl From<CallError> for ResolveError {
    fn from(err: CallError) -> Self {
        ResolveError::Call(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_import_message_names_module() {
        let err = ResolveError::import(
            "no_such_module_xyzzy",
            LoadError::ModuleNotFound("no_such_module_xyzzy".to_string()),
        );
        assert!(err.is_import());
        assert!(err.to_string().contains("'no_such_module_xyzzy'"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_attribute_kinds() {
        let missing = ResolveError::MissingAttribute {
            module: "os".to_string(),
            attribute_path: "path.nope".to_string(),
        };
        assert!(missing.is_attribute());
        assert_eq!(
            missing.to_string(),
            "lateimport: module 'os' has no attribute path 'path.nope'"
        );

        let unknown = ResolveError::UnknownExport {
            owner: "m".to_string(),
            attribute: "missing".to_string(),
        };
        assert_eq!(unknown.kind(), ErrorKind::Attribute);
        assert_eq!(unknown.to_string(), "module 'm' has no attribute 'missing'");
    }

    #[test]
    fn test_call_error_is_transparent() {
        let inner = CallError::raised("ValueError", "bad input");
        let err = ResolveError::from(inner.clone());

        assert_eq!(err.kind(), ErrorKind::Call);
        assert_eq!(err.to_string(), inner.to_string());
        assert!(err.source().is_none());
    }
}
