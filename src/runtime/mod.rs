//! Host Runtime Boundary
//!
//! This module provides the collaborators the deferred resolver consumes:
//! - `Value` / `Object` - host values and the member protocol
//! - `Module` - a namespace with an optional `__getattr__` hook
//! - `NativeFunction` - a callable backed by a Rust closure
//! - `ModuleLoader` - the black-box "load a dotted path" contract
//! - `ModuleRegistry` - an in-process loader with a module table
//! - Dotted path utilities (relative names, parents, joining)

pub mod builtins;
mod function;
mod loader;
mod module;
mod object;
mod path;
mod value;

pub use function::{NativeFn, NativeFunction};
pub use loader::{
    import_module, new_shared_registry, LoadError, LoadResult, ModuleInit, ModuleLoader,
    ModuleRegistry, SharedModuleRegistry,
};
pub use module::{GetattrHook, Module, Namespace};
pub use object::{CallError, CallResult, Kwargs, Object, ObjectRef};
pub use path::{dotted_path, leaf_name, parent_module_path, resolve_name, validate_module_name};
pub use value::{call, dir, getattr, setattr, Value};
