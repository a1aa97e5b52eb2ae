//! Object Protocol
//!
//! The member surface every host object exposes to the resolver:
//! - `get_member` - attribute read (may trigger an import through a hook)
//! - `set_member` - attribute write
//! - `call` - invocation with positional and keyword arguments
//! - `dir` - sorted member listing

use std::fmt;
use std::sync::Arc;

use super::loader::LoadResult;
use super::value::Value;

/// Shared, thread-safe reference to a host object.
pub type ObjectRef = Arc<dyn Object>;

/// Ordered keyword arguments.
pub type Kwargs = Vec<(String, Value)>;

/// Result type for invoking host objects.
pub type CallResult<T> = Result<T, CallError>;

/// Failures raised by the callee itself.
///
/// These belong to the callee's error domain and pass through the
/// resolver untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The value does not support invocation.
    NotCallable { type_name: String },
    /// The callee rejected its arguments.
    Arguments { callee: String, message: String },
    /// The callee failed while running.
    Raised { kind: String, message: String },
}

impl CallError {
    /// Convenience constructor for argument errors.
    pub fn arguments(callee: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Arguments {
            callee: callee.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for errors raised by a running callee.
    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        CallError::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::NotCallable { type_name } => {
                write!(f, "'{}' object is not callable", type_name)
            }
            CallError::Arguments { callee, message } => write!(f, "{}(): {}", callee, message),
            CallError::Raised { kind, message } => write!(f, "{}: {}", kind, message),
        }
    }
}

impl std::error::Error for CallError {}

/// A host object with an attribute namespace.
///
/// Implementations must be shareable across threads: a resolved value is
/// handed to every thread that raced on the same deferred handle.
pub trait Object: Send + Sync + fmt::Debug {
    /// Runtime type name used in diagnostics (e.g. `"module"`, `"function"`).
    fn type_name(&self) -> &str;

    /// Read an attribute.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - the attribute exists
    /// * `Ok(None)` - the attribute does not exist
    /// * `Err(_)` - producing the attribute required an import that failed
    fn get_member(&self, name: &str) -> LoadResult<Option<Value>>;

    /// Write an attribute. Returns `false` if the object rejects the write.
    fn set_member(&self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Invoke the object.
    fn call(&self, _args: &[Value], _kwargs: &Kwargs) -> CallResult<Value> {
        Err(CallError::NotCallable {
            type_name: self.type_name().to_string(),
        })
    }

    /// Sorted member names.
    fn dir(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Opaque;

    impl Object for Opaque {
        fn type_name(&self) -> &str {
            "opaque"
        }

        fn get_member(&self, _name: &str) -> LoadResult<Option<Value>> {
            Ok(None)
        }

        fn dir(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_default_call_is_not_callable() {
        let err = Opaque.call(&[], &Kwargs::new()).unwrap_err();
        assert_eq!(
            err,
            CallError::NotCallable {
                type_name: "opaque".to_string()
            }
        );
        assert_eq!(err.to_string(), "'opaque' object is not callable");
    }

    #[test]
    fn test_default_set_member_rejects() {
        assert!(!Opaque.set_member("x", Value::None));
    }

    #[test]
    fn test_call_error_display() {
        let err = CallError::arguments("join", "expected at least 1 argument");
        assert_eq!(err.to_string(), "join(): expected at least 1 argument");

        let err = CallError::raised("ValueError", "bad input");
        assert_eq!(err.to_string(), "ValueError: bad input");
    }
}
