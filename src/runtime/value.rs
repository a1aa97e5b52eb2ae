//! Host values.
//!
//! Scalars are stored inline; everything with a namespace (modules,
//! functions, user objects) is an [`ObjectRef`] compared by identity.

use std::fmt;
use std::sync::Arc;

use super::loader::LoadResult;
use super::object::{CallError, CallResult, Kwargs, Object, ObjectRef};

/// A value produced by the host runtime.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Long(i64),
    Str(String),
    List(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    /// Wrap any host object.
    pub fn object<T: Object + 'static>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Runtime type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Long(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Object(obj) => obj.type_name(),
        }
    }

    /// Truthiness in the host runtime's sense.
    ///
    /// Never used to decide whether something is resolved.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Long(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Identity comparison for objects, equality for scalars.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ptr_eq(y))
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Long(n) => write!(f, "Long({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(obj) => write!(f, "Object({:?})", obj),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

/// Read `name` from `value`.
///
/// Scalars only expose `__class__`.
pub fn getattr(value: &Value, name: &str) -> LoadResult<Option<Value>> {
    match value {
        Value::Object(obj) => obj.get_member(name),
        scalar if name == "__class__" => Ok(Some(Value::Str(scalar.type_name().to_string()))),
        _ => Ok(None),
    }
}

/// Write `name` on `value`. Scalars are immutable.
pub fn setattr(value: &Value, name: &str, new_value: Value) -> bool {
    match value {
        Value::Object(obj) => obj.set_member(name, new_value),
        _ => false,
    }
}

/// Invoke `value`.
pub fn call(value: &Value, args: &[Value], kwargs: &Kwargs) -> CallResult<Value> {
    match value {
        Value::Object(obj) => obj.call(args, kwargs),
        scalar => Err(CallError::NotCallable {
            type_name: scalar.type_name().to_string(),
        }),
    }
}

/// Sorted member names of `value`.
pub fn dir(value: &Value) -> Vec<String> {
    match value {
        Value::Object(obj) => obj.dir(),
        _ => vec!["__class__".to_string()],
    }
}
