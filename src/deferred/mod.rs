//! Deferred Resolution
//!
//! This module provides the proxy half of the crate:
//! - `DeferredHandle` - module + attribute chain resolved on first use
//! - `Attribute` - result of attribute access (deferred child or eager value)
//! - `EagerNames` / `DeferOptions` - which attribute names resolve immediately
//! - `ResolveError` - import, attribute and call failures with full paths

mod eager;
mod error;
mod handle;
mod options;

pub use eager::{EagerNames, INTROSPECTION_ATTRIBUTES};
pub use error::{ErrorKind, ResolveError, ResolveResult};
pub use handle::{lazy_import, Attribute, DeferredHandle};
pub use options::DeferOptions;
