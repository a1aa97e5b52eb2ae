//! Native functions exposed as host objects.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::loader::LoadResult;
use super::object::{CallResult, Kwargs, Object};
use super::value::Value;

/// Function body signature.
pub type NativeFn = dyn Fn(&[Value], &Kwargs) -> CallResult<Value> + Send + Sync;

/// A callable host object backed by a Rust closure.
///
/// Exposes `__name__`, `__qualname__` and `__module__`; `__doc__` only when a
/// docstring was given. Arbitrary attributes can be assigned.
pub struct NativeFunction {
    name: String,
    qualname: String,
    module: String,
    doc: Option<String>,
    body: Arc<NativeFn>,
    attributes: RwLock<HashMap<String, Value>>,
}

impl NativeFunction {
    pub fn new<F>(module: impl Into<String>, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> CallResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            qualname: name.clone(),
            name,
            module: module.into(),
            doc: None,
            body: Arc::new(body),
            attributes: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = qualname.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self, name: &str) -> Option<Value> {
        match name {
            "__name__" => Some(Value::Str(self.name.clone())),
            "__qualname__" => Some(Value::Str(self.qualname.clone())),
            "__module__" => Some(Value::Str(self.module.clone())),
            "__doc__" => self.doc.clone().map(Value::Str),
            "__class__" => Some(Value::from("builtin_function_or_method")),
            _ => None,
        }
    }
}

impl Object for NativeFunction {
    fn type_name(&self) -> &str {
        "builtin_function_or_method"
    }

    fn get_member(&self, name: &str) -> LoadResult<Option<Value>> {
        if let Some(value) = self.attributes.read().get(name) {
            return Ok(Some(value.clone()));
        }
        Ok(self.metadata(name))
    }

    fn set_member(&self, name: &str, value: Value) -> bool {
        self.attributes.write().insert(name.to_string(), value);
        true
    }

    fn call(&self, args: &[Value], kwargs: &Kwargs) -> CallResult<Value> {
        (self.body)(args, kwargs)
    }

    fn dir(&self) -> Vec<String> {
        let mut names: Vec<String> = ["__class__", "__module__", "__name__", "__qualname__"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if self.doc.is_some() {
            names.push("__doc__".to_string());
        }
        names.extend(self.attributes.read().keys().cloned());
        names.sort();
        names.dedup();
        names
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}.{}>", self.module, self.qualname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CallError;

    fn double() -> NativeFunction {
        NativeFunction::new("math_ext", "double", |args, _| match args {
            [Value::Long(n)] => Ok(Value::Long(n * 2)),
            _ => Err(CallError::arguments("double", "expected one int")),
        })
    }

    #[test]
    fn test_call_runs_body() {
        let f = double();
        assert_eq!(f.call(&[Value::Long(21)], &Kwargs::new()), Ok(Value::Long(42)));
    }

    #[test]
    fn test_call_propagates_body_error() {
        let f = double();
        let err = f.call(&[], &Kwargs::new()).unwrap_err();
        assert_eq!(err, CallError::arguments("double", "expected one int"));
    }

    #[test]
    fn test_doc_absent_unless_set() {
        assert_eq!(double().get_member("__doc__").unwrap(), None);

        let documented = double().with_doc("Double an int.");
        assert_eq!(
            documented.get_member("__doc__").unwrap(),
            Some(Value::from("Double an int."))
        );
    }

    #[test]
    fn test_assigned_attributes_visible() {
        let f = double();
        assert!(f.set_member("cache_hits", Value::Long(0)));
        assert_eq!(f.get_member("cache_hits").unwrap(), Some(Value::Long(0)));
        assert!(f.dir().contains(&"cache_hits".to_string()));
    }

    #[test]
    fn test_qualname_defaults_to_name() {
        let f = double();
        assert_eq!(f.get_member("__qualname__").unwrap(), Some(Value::from("double")));

        let method = double().with_qualname("Doubler.double");
        assert_eq!(
            method.get_member("__qualname__").unwrap(),
            Some(Value::from("Doubler.double"))
        );
    }
}
