//! Host Module Structure
//!
//! A `Module` is a named namespace plus an optional attribute-miss hook.
//!
//! Lookup order for `get_member`:
//! 1. The namespace (anything assigned or cached)
//! 2. Synthesized metadata (`__name__`, `__package__`, `__doc__`)
//! 3. The installed `__getattr__` hook, if any
//!
//! Because the namespace is consulted first, a value the hook cached into the
//! namespace is never routed through the hook again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::loader::LoadResult;
use super::object::Object;
use super::path::parent_module_path;
use super::value::Value;

/// Shared attribute namespace of a module.
///
/// Also serves as the attribute cache a dispatch hook writes into.
pub type Namespace = Arc<RwLock<HashMap<String, Value>>>;

/// Attribute-miss handler: the host's `__getattr__` fallback.
pub type GetattrHook = Arc<dyn Fn(&str) -> LoadResult<Option<Value>> + Send + Sync>;

const METADATA: [&str; 3] = ["__doc__", "__name__", "__package__"];

/// A loaded host module.
pub struct Module {
    /// Fully qualified dotted name (e.g. `"os.path"`).
    name: String,
    /// Containing package (`""` for top-level modules).
    package: String,
    doc: Option<String>,
    namespace: Namespace,
    getattr_hook: RwLock<Option<GetattrHook>>,
}

impl Module {
    /// Create an empty module named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let package = parent_module_path(&name).unwrap_or("").to_string();
        Self {
            name,
            package,
            doc: None,
            namespace: Arc::new(RwLock::new(HashMap::new())),
            getattr_hook: RwLock::new(None),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Handle to the module's namespace.
    pub fn namespace(&self) -> Namespace {
        Arc::clone(&self.namespace)
    }

    /// Bind `name` in the namespace, replacing any previous binding.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.namespace.write().insert(name.into(), value.into());
    }

    /// Look up `name` in the namespace only (no metadata, no hook).
    pub fn get(&self, name: &str) -> Option<Value> {
        self.namespace.read().get(name).cloned()
    }

    /// Install the attribute-miss handler.
    pub fn install_getattr_hook(&self, hook: GetattrHook) {
        *self.getattr_hook.write() = Some(hook);
    }

    pub fn has_getattr_hook(&self) -> bool {
        self.getattr_hook.read().is_some()
    }

    fn metadata(&self, name: &str) -> Option<Value> {
        match name {
            "__name__" => Some(Value::Str(self.name.clone())),
            "__package__" => Some(Value::Str(self.package.clone())),
            "__doc__" => Some(self.doc.clone().map_or(Value::None, Value::Str)),
            _ => None,
        }
    }
}

impl Object for Module {
    fn type_name(&self) -> &str {
        "module"
    }

    fn get_member(&self, name: &str) -> LoadResult<Option<Value>> {
        if let Some(value) = self.get(name) {
            return Ok(Some(value));
        }
        if let Some(value) = self.metadata(name) {
            return Ok(Some(value));
        }
        // Clone the hook out so it runs without holding the lock; it may
        // import modules that touch this one.
        let hook = self.getattr_hook.read().clone();
        match hook {
            Some(hook) => hook(name),
            None => Ok(None),
        }
    }

    fn set_member(&self, name: &str, value: Value) -> bool {
        self.insert(name, value);
        true
    }

    fn dir(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespace.read().keys().cloned().collect();
        names.extend(METADATA.iter().map(|s| s.to_string()));
        names.sort();
        names.dedup();
        names
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("members", &self.namespace.read().len())
            .field("getattr_hook", &self.has_getattr_hook())
            .finish()
    }
}
