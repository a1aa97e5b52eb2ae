//! lateimport - Deferred Module Loading
//!
//! This library lets code refer to a module, or to a dotted attribute path
//! inside one, without loading it until the value is actually used.
//!
//! # Architecture
//!
//! The crate consists of three layers:
//!
//! 1. **Host runtime** (`runtime` module)
//!    - `ModuleLoader`: the "load a dotted path" contract
//!    - `ModuleRegistry`: in-process module table with at-most-once initialisation
//!    - `Value`, `Object`, `Module`, `NativeFunction`: what loading produces
//!
//! 2. **Deferred handles** (`deferred` module)
//!    - `DeferredHandle`: module + attribute chain, resolved on first forcing use
//!    - Attribute access defers further except for eager (introspection) names
//!    - Resolution is thread-safe, double-checked, and marks ancestor handles
//!
//! 3. **Dispatch hooks** (`dispatch` module)
//!    - `DispatchTable`: `name -> (package, module)` rows
//!    - `build_dispatch_hook`: package `__getattr__` that caches into the namespace
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lateimport::runtime::{builtins, ModuleRegistry, Value};
//! use lateimport::{lazy_import, Attribute};
//!
//! let registry = Arc::new(ModuleRegistry::new());
//! builtins::install(&registry);
//!
//! let os = lazy_import(registry.clone(), "os", Vec::<String>::new());
//! let join = match os.chain(["path", "join"]).unwrap() {
//!     Attribute::Deferred(handle) => handle,
//!     Attribute::Resolved(_) => unreachable!(),
//! };
//! assert_eq!(registry.load_count("os.path"), 0);
//!
//! let joined = join.call(&[Value::from("a"), Value::from("b")]).unwrap();
//! assert!(joined.as_str().unwrap().ends_with('b'));
//! assert!(os.is_resolved());
//! ```
//!
//! # Ergonomics
//!
//! Attribute access is an explicit `attr(name)` call rather than transparent
//! interception; everything else (calling, assignment, listing, display,
//! status) maps one-to-one onto handle methods.

pub mod deferred;
pub mod dispatch;
pub mod runtime;

pub use deferred::{
    lazy_import, Attribute, DeferOptions, DeferredHandle, EagerNames, ErrorKind, ResolveError,
    ResolveResult, INTROSPECTION_ATTRIBUTES,
};
pub use dispatch::{build_dispatch_hook, DispatchHook, DispatchTable};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::{builtins, ModuleRegistry, Value};
    use std::sync::Arc;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION.split('.').count(), 3);
    }

    #[test]
    fn test_lazy_import_then_call() {
        let registry = Arc::new(ModuleRegistry::new());
        builtins::install(&registry);

        let join = lazy_import(registry.clone(), "os.path", ["join"]);
        assert!(!join.is_resolved());
        assert_eq!(registry.load_count("os.path"), 0);

        let result = join.call(&[Value::from("x")]).unwrap();
        assert_eq!(result, Value::from("x"));
        assert_eq!(registry.load_count("os.path"), 1);
    }
}
