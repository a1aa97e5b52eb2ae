//! Dispatch Hooks
//!
//! This module provides the package-level half of the crate:
//! - `DispatchTable` - static `name -> (package, module)` rows, from code or TOML
//! - `DispatchHook` - first-access resolver that caches into a module namespace
//! - `build_dispatch_hook` - the factory

mod hook;
mod table;

pub use hook::{build_dispatch_hook, AttributeCache, DispatchHook};
pub use table::{DispatchEntry, DispatchTable, ModuleMarker, TableError, MODULE_MARKER};
