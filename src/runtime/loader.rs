//! Module Loader
//!
//! Implements the loading side of the host runtime:
//! - `ModuleLoader` - the black-box contract the resolver consumes
//! - `ModuleRegistry` - an in-process loader with a module table
//!
//! # Loading Semantics
//!
//! - Each registered initialiser runs at most once per registry; the result is
//!   cached in the module table and returned on every later load.
//! - Parent packages load first, and the child is bound as an attribute of
//!   its parent (`os` gains `path` once `os.path` loads).
//! - A failing initialiser leaves nothing cached, so a later load re-runs it.
//! - Re-entering the load of a module that is still initialising is reported
//!   as a circular import instead of recursing.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, trace};

use super::module::Module;
use super::object::{Object, ObjectRef};
use super::path::{leaf_name, parent_module_path, resolve_name, validate_module_name};
use super::value::Value;

/// Result type for module loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can occur during module loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No module is registered under this dotted path.
    ModuleNotFound(String),
    /// The module's initialiser failed.
    ExecutionFailed { module: String, reason: String },
    /// The dotted path is malformed.
    InvalidName(String),
    /// A relative name could not be resolved against its package.
    ImportConstraint(String),
    /// The module is already being initialised on this thread.
    CircularImport(String),
}

impl LoadError {
    /// The module path this error refers to, when it names one.
    pub fn module(&self) -> Option<&str> {
        match self {
            LoadError::ModuleNotFound(m)
            | LoadError::InvalidName(m)
            | LoadError::CircularImport(m) => Some(m),
            LoadError::ExecutionFailed { module, .. } => Some(module),
            LoadError::ImportConstraint(_) => None,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::ModuleNotFound(module) => write!(f, "No module named '{}'", module),
            LoadError::ExecutionFailed { module, reason } => {
                write!(f, "Module '{}' failed to initialise: {}", module, reason)
            }
            LoadError::InvalidName(name) => write!(f, "Invalid module name '{}'", name),
            LoadError::ImportConstraint(msg) => write!(f, "Import constraint: {}", msg),
            LoadError::CircularImport(module) => {
                write!(f, "Circular import detected: '{}'", module)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Loads a module given its absolute dotted path.
///
/// This is the only capability the deferred resolver needs from a host
/// runtime. Implementations decide what "loading" means; the resolver only
/// guarantees how often it asks.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &str) -> LoadResult<ObjectRef>;
}

/// Import `name`, resolving leading dots against `package`.
pub fn import_module(
    loader: &dyn ModuleLoader,
    name: &str,
    package: Option<&str>,
) -> LoadResult<ObjectRef> {
    let absolute = resolve_name(name, package)?;
    loader.load(&absolute)
}

/// Module initialiser: populates a freshly created module.
///
/// Runs once per successful load. Returning `Err` aborts the load.
pub type ModuleInit = Arc<dyn Fn(&Module) -> Result<(), String> + Send + Sync>;

/// In-process module table.
///
/// This struct manages:
/// - Registered initialisers (dotted path → init function)
/// - Loaded modules (dotted path → module object)
/// - Modules currently initialising (cycle detection)
/// - Execution counts (observability for tests and diagnostics)
pub struct ModuleRegistry {
    initialisers: RwLock<HashMap<String, ModuleInit>>,
    modules: RwLock<HashMap<String, ObjectRef>>,
    loading: Mutex<HashSet<String>>,
    executions: DashMap<String, usize>,
    /// Serialises initialisation; reentrant so parents load under the same guard.
    import_lock: ReentrantMutex<()>,
}

impl ModuleRegistry {
    /// Create a new empty module registry.
    pub fn new() -> Self {
        Self {
            initialisers: RwLock::new(HashMap::new()),
            modules: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashSet::new()),
            executions: DashMap::new(),
            import_lock: ReentrantMutex::new(()),
        }
    }

    /// Register an initialiser for `path`, replacing any previous one.
    ///
    /// Already loaded modules are not affected.
    pub fn register<F>(&self, path: impl Into<String>, init: F)
    where
        F: Fn(&Module) -> Result<(), String> + Send + Sync + 'static,
    {
        self.initialisers.write().insert(path.into(), Arc::new(init));
    }

    /// Place an already built object in the module table.
    pub fn insert_loaded(&self, path: impl Into<String>, module: ObjectRef) {
        self.modules.write().insert(path.into(), module);
    }

    /// Check if a module is in the module table.
    pub fn is_loaded(&self, path: &str) -> bool {
        self.modules.read().contains_key(path)
    }

    /// How many times the initialiser for `path` has run.
    pub fn load_count(&self, path: &str) -> usize {
        self.executions.get(path).map_or(0, |n| *n)
    }

    /// Get the number of loaded modules.
    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }

    fn cached(&self, path: &str) -> Option<ObjectRef> {
        self.modules.read().get(path).cloned()
    }

    fn execute(&self, path: &str) -> LoadResult<ObjectRef> {
        let parent = parent_module_path(path)
            .map(|parent| self.load(parent))
            .transpose()?;

        let init = self
            .initialisers
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::ModuleNotFound(path.to_string()))?;

        *self.executions.entry(path.to_string()).or_insert(0) += 1;
        debug!(target: "lateimport::runtime::loader::execute", module = path, "initialising module");

        let module = Module::new(path);
        init(&module).map_err(|reason| LoadError::ExecutionFailed {
            module: path.to_string(),
            reason,
        })?;

        let module: ObjectRef = Arc::new(module);
        self.modules
            .write()
            .insert(path.to_string(), Arc::clone(&module));
        if let Some(parent) = parent {
            parent.set_member(leaf_name(path), Value::Object(Arc::clone(&module)));
        }
        Ok(module)
    }
}

impl ModuleLoader for ModuleRegistry {
    fn load(&self, path: &str) -> LoadResult<ObjectRef> {
        validate_module_name(path)?;
        if let Some(module) = self.cached(path) {
            trace!(target: "lateimport::runtime::loader::load", module = path, "module table hit");
            return Ok(module);
        }

        let _guard = self.import_lock.lock();
        if let Some(module) = self.cached(path) {
            return Ok(module);
        }
        if !self.loading.lock().insert(path.to_string()) {
            return Err(LoadError::CircularImport(path.to_string()));
        }
        let result = self.execute(path);
        self.loading.lock().remove(path);
        result
    }
}

impl<L: ModuleLoader + ?Sized> ModuleLoader for Arc<L> {
    fn load(&self, path: &str) -> LoadResult<ObjectRef> {
        (**self).load(path)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("module_count", &self.module_count())
            .field("registered", &self.initialisers.read().len())
            .field("loading_count", &self.loading.lock().len())
            .finish()
    }
}

/// Thread-safe handle to a ModuleRegistry.
pub type SharedModuleRegistry = Arc<ModuleRegistry>;

/// Create a new shared module registry.
pub fn new_shared_registry() -> SharedModuleRegistry {
    Arc::new(ModuleRegistry::new())
}
