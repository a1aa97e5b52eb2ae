//! Deferred Handle
//!
//! A `DeferredHandle` names a module plus an attribute chain and loads it only
//! when the value is used.
//!
//! # Resolution Protocol
//!
//! **Fast path:** the resolved cell is a `OnceLock`; once set it is read
//! without taking the lock and is never cleared.
//!
//! **Slow path:** take the per-handle mutex, check the cell again, then load
//! the base module, walk the attribute chain, store the value and mark every
//! ancestor handle as resolved. Only the thread that finds the cell empty
//! under the lock performs the load, so each handle loads at most once.
//!
//! Failures leave the cell empty; the next forcing operation starts over.
//!
//! # Attribute Access
//!
//! `attr(name)` returns a new child handle (no loading) unless `name` is in
//! the handle's eager-name set, in which case the handle resolves and the
//! attribute is read from the concrete value.
//!
//! # Ancestor Marking
//!
//! Resolving a child marks its ancestors resolved without giving them a value.
//! An ancestor marked this way still loads its own target if it is forced
//! later; the mark only affects `is_resolved()` and the display status.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::error::{ResolveError, ResolveResult};
use super::options::DeferOptions;
use crate::runtime::{self, dotted_path, Kwargs, LoadError, ModuleLoader, Value};

type AttributeChain = SmallVec<[String; 4]>;

/// Outcome of accessing an attribute on a handle.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// A further deferred handle; nothing was loaded.
    Deferred(DeferredHandle),
    /// An eager attribute read from the resolved value.
    Resolved(Value),
}

impl Attribute {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Attribute::Deferred(_))
    }

    pub fn into_deferred(self) -> Option<DeferredHandle> {
        match self {
            Attribute::Deferred(handle) => Some(handle),
            Attribute::Resolved(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Attribute::Resolved(value) => Some(value),
            Attribute::Deferred(_) => None,
        }
    }
}

/// Proxy for a module or a dotted attribute path that loads on first use.
///
/// Cloning yields another reference to the same handle (shared cache and
/// lock). Handles built separately from equal paths are distinct and resolve
/// independently.
#[derive(Clone)]
pub struct DeferredHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    module_name: String,
    attributes: AttributeChain,
    loader: Arc<dyn ModuleLoader>,
    options: DeferOptions,
    /// Handle this one was derived from. Only used for ancestor marking.
    ///
    /// Owning rather than weak: handles only link toward the root, so no
    /// cycle can form, and marking still reaches the root after intermediate
    /// handles are dropped.
    parent: Option<Arc<HandleInner>>,
    value: OnceLock<Value>,
    marked: AtomicBool,
    lock: Mutex<()>,
}

impl DeferredHandle {
    /// Create a handle for `module_name` followed by `attributes`.
    ///
    /// Performs no loading and cannot fail.
    pub fn new<I, S>(loader: Arc<dyn ModuleLoader>, module_name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(loader, module_name, attributes, DeferOptions::default())
    }

    /// Create a handle for a module with an empty attribute chain.
    pub fn module(loader: Arc<dyn ModuleLoader>, module_name: impl Into<String>) -> Self {
        Self::new(loader, module_name, std::iter::empty::<String>())
    }

    pub fn with_options<I, S>(
        loader: Arc<dyn ModuleLoader>,
        module_name: impl Into<String>,
        attributes: I,
        options: DeferOptions,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(HandleInner {
                module_name: module_name.into(),
                attributes: attributes.into_iter().map(Into::into).collect(),
                loader,
                options,
                parent: None,
                value: OnceLock::new(),
                marked: AtomicBool::new(false),
                lock: Mutex::new(()),
            }),
        }
    }

    /// Dotted module path loaded first.
    pub fn module_name(&self) -> &str {
        &self.inner.module_name
    }

    /// Attribute chain walked after loading.
    pub fn attributes(&self) -> &[String] {
        &self.inner.attributes
    }

    /// Full dotted path: module name plus attribute chain.
    pub fn path(&self) -> String {
        self.inner.path()
    }

    pub fn options(&self) -> &DeferOptions {
        &self.inner.options
    }

    /// The handle this one was derived from, if any.
    pub fn parent(&self) -> Option<DeferredHandle> {
        self.inner.parent.as_ref().map(|inner| DeferredHandle {
            inner: Arc::clone(inner),
        })
    }

    /// True once this handle, or any handle derived from it, has resolved.
    ///
    /// Never triggers loading.
    pub fn is_resolved(&self) -> bool {
        self.inner.marked.load(Ordering::Acquire) || self.inner.value.get().is_some()
    }

    /// Whether both values refer to the same handle.
    pub fn ptr_eq(&self, other: &DeferredHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Access `name`.
    ///
    /// Eager names resolve this handle and read the attribute from the
    /// resolved value; every other name yields a child handle.
    pub fn attr(&self, name: &str) -> ResolveResult<Attribute> {
        if !self.inner.options.eager_names.contains(name) {
            return Ok(Attribute::Deferred(self.child(name)));
        }

        let target = self.resolve()?;
        match runtime::getattr(&target, name) {
            Ok(Some(value)) => Ok(Attribute::Resolved(value)),
            Ok(None) => Err(ResolveError::MissingIntrospection {
                path: self.path(),
                attribute: name.to_string(),
            }),
            Err(source) => Err(import_failure(&self.inner.module_name, source)),
        }
    }

    /// Apply `attr` for each name in turn.
    ///
    /// Once an eager name yields a concrete value, later names are read
    /// directly from that value.
    pub fn chain<I, S>(&self, names: I) -> ResolveResult<Attribute>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = Attribute::Deferred(self.clone());
        let mut origin = self.path();
        let mut walked: Vec<String> = Vec::new();

        for name in names {
            let name = name.as_ref();
            current = match current {
                Attribute::Deferred(handle) => {
                    let next = handle.attr(name)?;
                    if !next.is_deferred() {
                        origin = format!("{}.{}", handle.path(), name);
                    }
                    next
                }
                Attribute::Resolved(value) => {
                    walked.push(name.to_string());
                    match runtime::getattr(&value, name) {
                        Ok(Some(next)) => Attribute::Resolved(next),
                        Ok(None) => {
                            return Err(ResolveError::MissingAttribute {
                                module: origin,
                                attribute_path: walked.join("."),
                            })
                        }
                        Err(source) => return Err(import_failure(&self.inner.module_name, source)),
                    }
                }
            };
        }
        Ok(current)
    }

    /// Force resolution and return the concrete value.
    ///
    /// Concurrent callers block until the first one finishes; all of them
    /// observe the same value.
    pub fn resolve(&self) -> ResolveResult<Value> {
        if let Some(value) = self.inner.value.get() {
            trace!(target: "lateimport::deferred::resolve", path = %self.inner.path(), "cached");
            return Ok(value.clone());
        }

        let _guard = self.inner.lock.lock();
        if let Some(value) = self.inner.value.get() {
            return Ok(value.clone());
        }

        debug!(target: "lateimport::deferred::resolve", path = %self.inner.path(), "resolving");
        let loaded = self.inner.load_target()?;
        let value = self.inner.value.get_or_init(|| loaded).clone();
        self.inner.marked.store(true, Ordering::Release);
        self.inner.mark_ancestors();
        debug!(target: "lateimport::deferred::resolve", path = %self.inner.path(), kind = value.type_name(), "resolved");
        Ok(value)
    }

    /// Resolve and call with positional arguments.
    pub fn call(&self, args: &[Value]) -> ResolveResult<Value> {
        self.call_with(args, &Kwargs::new())
    }

    /// Resolve and call. Errors raised by the callee are returned as
    /// `ResolveError::Call` without further context.
    pub fn call_with(&self, args: &[Value], kwargs: &Kwargs) -> ResolveResult<Value> {
        let target = self.resolve()?;
        runtime::call(&target, args, kwargs).map_err(ResolveError::Call)
    }

    /// Resolve and assign `name` on the resolved value.
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) -> ResolveResult<()> {
        let target = self.resolve()?;
        if runtime::setattr(&target, name, value.into()) {
            Ok(())
        } else {
            Err(ResolveError::ReadOnly {
                path: self.path(),
                attribute: name.to_string(),
            })
        }
    }

    /// Resolve and list the resolved value's members.
    pub fn dir(&self) -> ResolveResult<Vec<String>> {
        Ok(runtime::dir(&self.resolve()?))
    }

    fn child(&self, name: &str) -> DeferredHandle {
        let mut attributes = self.inner.attributes.clone();
        attributes.push(name.to_string());
        let child = DeferredHandle {
            inner: Arc::new(HandleInner {
                module_name: self.inner.module_name.clone(),
                attributes,
                loader: Arc::clone(&self.inner.loader),
                options: self.inner.options.clone(),
                parent: Some(Arc::clone(&self.inner)),
                value: OnceLock::new(),
                marked: AtomicBool::new(false),
                lock: Mutex::new(()),
            }),
        };
        trace!(target: "lateimport::deferred::attr", path = %child.path(), "deferred");
        child
    }
}

impl HandleInner {
    fn path(&self) -> String {
        dotted_path(&self.module_name, &self.attributes)
    }

    fn load_target(&self) -> ResolveResult<Value> {
        let module = self
            .loader
            .load(&self.module_name)
            .map_err(|source| ResolveError::import(&self.module_name, source))?;

        let mut current = Value::Object(module);
        for (i, attribute) in self.attributes.iter().enumerate() {
            current = match runtime::getattr(&current, attribute) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    return Err(ResolveError::MissingAttribute {
                        module: self.module_name.clone(),
                        attribute_path: self.attributes[..=i].join("."),
                    })
                }
                Err(source) => return Err(import_failure(&self.module_name, source)),
            };
        }
        Ok(current)
    }

    /// Mark every unmarked ancestor, stopping at the first one already marked
    /// (its own ancestors were marked when it was).
    fn mark_ancestors(&self) {
        let mut ancestor = self.parent.as_deref();
        while let Some(handle) = ancestor {
            if handle.marked.swap(true, Ordering::AcqRel) {
                break;
            }
            trace!(target: "lateimport::deferred::mark_ancestors", path = %handle.path(), "marked resolved");
            ancestor = handle.parent.as_deref();
        }
    }
}

/// An import failure raised while reading an attribute (through a module's
/// `__getattr__` hook) names the module that failed, if it knows it.
fn import_failure(fallback: &str, source: LoadError) -> ResolveError {
    let module = source.module().unwrap_or(fallback).to_string();
    ResolveError::import(module, source)
}

impl PartialEq for DeferredHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DeferredHandle {}

impl fmt::Display for DeferredHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_resolved() { "resolved" } else { "pending" };
        write!(f, "<DeferredHandle '{}' ({})>", self.path(), status)
    }
}

impl fmt::Debug for DeferredHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredHandle")
            .field("path", &self.path())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Create a deferred handle for `module_name`, optionally drilling into
/// `attributes`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lateimport::runtime::{builtins, ModuleRegistry, Value};
/// use lateimport::lazy_import;
///
/// let registry = Arc::new(ModuleRegistry::new());
/// builtins::install(&registry);
///
/// let join = lazy_import(registry.clone(), "os.path", ["join"]);
/// assert!(!join.is_resolved());
///
/// join.call(&[Value::from("a"), Value::from("b")]).unwrap();
/// assert!(join.is_resolved());
/// ```
pub fn lazy_import<I, S>(
    loader: Arc<dyn ModuleLoader>,
    module_name: impl Into<String>,
    attributes: I,
) -> DeferredHandle
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    DeferredHandle::new(loader, module_name, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{builtins, ModuleRegistry};

    fn registry() -> Arc<ModuleRegistry> {
        let registry = Arc::new(ModuleRegistry::new());
        builtins::install(&registry);
        registry
    }

    #[test]
    fn test_not_resolved_on_creation() {
        let registry = registry();
        let handle = DeferredHandle::module(registry.clone(), "os");

        assert!(!handle.is_resolved());
        assert_eq!(registry.load_count("os"), 0);
    }

    #[test]
    fn test_display_pending_then_resolved() {
        let handle = DeferredHandle::new(registry(), "os.path", ["join"]);
        assert_eq!(handle.to_string(), "<DeferredHandle 'os.path.join' (pending)>");

        handle.resolve().unwrap();
        assert_eq!(handle.to_string(), "<DeferredHandle 'os.path.join' (resolved)>");
    }

    #[test]
    fn test_child_extends_chain() {
        let root = DeferredHandle::module(registry(), "os");
        let child = root.attr("path").unwrap().into_deferred().unwrap();

        assert_eq!(child.module_name(), "os");
        assert_eq!(child.attributes(), ["path".to_string()]);
        assert!(child.parent().unwrap().ptr_eq(&root));
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_resolution_cached() {
        let registry = registry();
        let handle = DeferredHandle::new(registry.clone(), "os.path", ["join"]);

        let first = handle.resolve().unwrap();
        let second = handle.resolve().unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(registry.load_count("os.path"), 1);
    }

    #[test]
    fn test_falsy_value_counts_as_resolved() {
        let registry = registry();
        registry.register("flags", |m| {
            m.insert("enabled", Value::None);
            m.insert("count", 0_i64);
            Ok(())
        });

        let enabled = DeferredHandle::new(registry.clone(), "flags", ["enabled"]);
        assert_eq!(enabled.resolve().unwrap(), Value::None);
        assert!(enabled.is_resolved());

        let count = DeferredHandle::new(registry.clone(), "flags", ["count"]);
        assert_eq!(count.resolve().unwrap(), Value::Long(0));
        assert_eq!(count.resolve().unwrap(), Value::Long(0));
        assert_eq!(registry.load_count("flags"), 1);
    }

    #[test]
    fn test_marked_ancestor_still_resolves_own_target() {
        let root = DeferredHandle::module(registry(), "os");
        let child = root.attr("sep").unwrap().into_deferred().unwrap();

        child.resolve().unwrap();
        assert!(root.is_resolved());

        let module = root.resolve().unwrap();
        assert_eq!(module.type_name(), "module");
    }

    #[test]
    fn test_transparent_options_defer_dunders() {
        let handle = DeferredHandle::with_options(
            registry(),
            "os.path",
            ["join"],
            DeferOptions::transparent(),
        );

        let doc = handle.attr("__doc__").unwrap();
        assert!(doc.is_deferred());
        assert!(!handle.is_resolved());
    }

    #[test]
    fn test_read_only_assignment() {
        let handle = DeferredHandle::new(registry(), "os", ["sep"]);
        let err = handle.set_attr("x", 1_i64).unwrap_err();

        assert!(err.is_attribute());
        assert!(err.to_string().contains("'os.sep'"));
    }

    #[test]
    fn test_chain_after_eager_attribute() {
        let handle = DeferredHandle::module(registry(), "os");
        let class_name = handle.chain(["sep", "__class__"]).unwrap();
        assert_eq!(class_name.into_value(), Some(Value::from("str")));

        let err = handle.chain(["sep", "__class__", "upper"]).unwrap_err();
        assert!(err.to_string().contains("'upper'"));
    }

    #[test]
    fn test_handle_equality_is_identity() {
        let registry = registry();
        let a = DeferredHandle::module(registry.clone(), "os");
        let b = DeferredHandle::module(registry, "os");

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
