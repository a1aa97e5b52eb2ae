//! Package-level `__getattr__` hooks generated from a dispatch table.
//!
//! A hook resolves an exported name on first access and writes the result into
//! the owning module's namespace. The namespace is consulted before the hook,
//! so every later access is a plain namespace hit.
//!
//! Each attribute name has its own lock: two threads asking for the same
//! never-seen name perform one import between them, while unrelated names
//! resolve in parallel.
//!
//! The lock is reentrant and records whether the owning thread is already
//! resolving the name. A submodule initialiser that reads the export it is
//! being imported for gets a circular-import error instead of blocking.

use std::cell::Cell;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use tracing::debug;

use super::table::{DispatchEntry, DispatchTable, ModuleMarker};
use crate::deferred::{ResolveError, ResolveResult};
use crate::runtime::{self, GetattrHook, LoadError, ModuleLoader, Namespace, Value};

/// Per-name lock; the cell is `true` while the holder is mid-resolution.
type NameSlot = Arc<ReentrantMutex<Cell<bool>>>;

/// Namespace the hook caches resolved attributes into.
pub type AttributeCache = Namespace;

/// Attribute resolver for one owning module.
pub struct DispatchHook {
    table: DispatchTable,
    cache: AttributeCache,
    owner: String,
    loader: Arc<dyn ModuleLoader>,
    in_flight: DashMap<String, NameSlot>,
}

/// Build the hook for `owner` from `table`, caching into `cache`.
///
/// ```
/// use std::sync::Arc;
/// use lateimport::dispatch::{build_dispatch_hook, DispatchTable};
/// use lateimport::runtime::{builtins, Module, ModuleRegistry};
///
/// let registry = Arc::new(ModuleRegistry::new());
/// builtins::install(&registry);
///
/// let owner = Module::new("m");
/// let hook = build_dispatch_hook(
///     DispatchTable::new([("join", ("os", "path"))]),
///     owner.namespace(),
///     "m",
///     registry,
/// );
///
/// hook.resolve("join").unwrap();
/// assert!(owner.get("join").is_some());
/// ```
pub fn build_dispatch_hook(
    table: DispatchTable,
    cache: AttributeCache,
    owner: impl Into<String>,
    loader: Arc<dyn ModuleLoader>,
) -> DispatchHook {
    DispatchHook {
        table,
        cache,
        owner: owner.into(),
        loader,
        in_flight: DashMap::new(),
    }
}

impl DispatchHook {
    /// Logical owner (the module this hook serves).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Generated docstring.
    pub fn doc(&self) -> String {
        format!(
            "Lazy-import `__getattr__` for '{}'. Generated by lateimport.",
            self.owner
        )
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Resolve `name`, caching it in the owner's namespace.
    pub fn resolve(&self, name: &str) -> ResolveResult<Value> {
        let entry = self
            .table
            .get(name)
            .ok_or_else(|| ResolveError::UnknownExport {
                owner: self.owner.clone(),
                attribute: name.to_string(),
            })?;

        let slot = Arc::clone(
            self.in_flight
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(Cell::new(false))))
                .value(),
        );
        let resolving = slot.lock();
        if resolving.get() {
            return Err(ResolveError::import(
                source_module(name, entry),
                LoadError::CircularImport(format!("{}.{}", self.owner, name)),
            ));
        }
        if let Some(value) = self.cache.read().get(name) {
            return Ok(value.clone());
        }

        resolving.set(true);
        let loaded = self.load_export(name, entry);
        resolving.set(false);
        let value = loaded?;

        debug!(
            target: "lateimport::dispatch::resolve",
            owner = %self.owner,
            attribute = name,
            package = %entry.package,
            module = %entry.module,
            "resolved export"
        );
        Ok(self
            .cache
            .write()
            .entry(name.to_string())
            .or_insert(value)
            .clone())
    }

    /// Adapt into a module attribute-miss handler.
    ///
    /// Names outside the table and names missing from their submodule read as
    /// absent; import failures propagate.
    pub fn into_getattr_hook(self: Arc<Self>) -> GetattrHook {
        Arc::new(move |name: &str| match self.resolve(name) {
            Ok(value) => Ok(Some(value)),
            Err(ResolveError::Import { source, .. }) => Err(source),
            Err(_) => Ok(None),
        })
    }

    fn load_export(&self, name: &str, entry: &DispatchEntry) -> ResolveResult<Value> {
        match &entry.module {
            ModuleMarker::SelfModule => {
                Ok(Value::Object(self.import(&format!(".{}", name), &entry.package)?))
            }
            ModuleMarker::Submodule(module) => {
                let source = Value::Object(self.import(&format!(".{}", module), &entry.package)?);
                runtime::getattr(&source, name)
                    .map_err(|err| ResolveError::import(source_module(name, entry), err))?
                    .ok_or_else(|| ResolveError::MissingAttribute {
                        module: source_module(name, entry),
                        attribute_path: name.to_string(),
                    })
            }
        }
    }

    fn import(&self, relative: &str, package: &str) -> ResolveResult<runtime::ObjectRef> {
        let absolute = runtime::resolve_name(relative, Some(package))
            .map_err(|err| ResolveError::import(package, err))?;
        self.loader
            .load(&absolute)
            .map_err(|err| ResolveError::import(absolute, err))
    }
}

/// Dotted path of the module an export is imported from.
fn source_module(name: &str, entry: &DispatchEntry) -> String {
    match &entry.module {
        ModuleMarker::SelfModule => format!("{}.{}", entry.package, name),
        ModuleMarker::Submodule(module) => format!("{}.{}", entry.package, module),
    }
}

impl std::fmt::Debug for DispatchHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHook")
            .field("owner", &self.owner)
            .field("exports", &self.table.len())
            .finish()
    }
}
