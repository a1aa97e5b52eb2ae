//! Dotted Module Path Resolution
//!
//! Supports the notations a dispatch table and a deferred handle use:
//! - `pkg.sub.leaf` - Absolute dotted path
//! - `.leaf` - Relative to a package (one dot per level, `..leaf` walks up)

use itertools::Itertools;

use super::loader::{LoadError, LoadResult};

/// Extract the parent module path from a dotted path.
///
/// # Examples
/// - `"os.path"` -> `Some("os")`
/// - `"os"` -> `None`
pub fn parent_module_path(path: &str) -> Option<&str> {
    path.rfind('.').map(|idx| &path[..idx])
}

/// Last segment of a dotted path (`"os.path"` -> `"path"`).
pub fn leaf_name(path: &str) -> &str {
    path.rfind('.').map_or(path, |idx| &path[idx + 1..])
}

/// Render `module` followed by an attribute chain as one dotted path.
pub fn dotted_path<S: AsRef<str>>(module: &str, attributes: &[S]) -> String {
    if attributes.is_empty() {
        module.to_string()
    } else {
        format!(
            "{}.{}",
            module,
            attributes.iter().map(AsRef::<str>::as_ref).join(".")
        )
    }
}

/// Reject empty names and empty segments (`"a..b"`, `"a."`).
pub fn validate_module_name(name: &str) -> LoadResult<()> {
    if name.is_empty() || name.split('.').any(str::is_empty) {
        return Err(LoadError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Resolve a possibly relative module name against `package`.
///
/// Absolute names are returned unchanged. Each leading dot beyond the first
/// moves one level up from `package`.
///
/// # Examples
/// - `resolve_name(".path", Some("os"))` -> `"os.path"`
/// - `resolve_name("..core", Some("pkg.sub"))` -> `"pkg.core"`
/// - `resolve_name("json", None)` -> `"json"`
pub fn resolve_name(name: &str, package: Option<&str>) -> LoadResult<String> {
    let rest = name.trim_start_matches('.');
    let level = name.len() - rest.len();
    if level == 0 {
        return Ok(name.to_string());
    }

    let package = match package {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Err(LoadError::ImportConstraint(format!(
                "the 'package' argument is required to perform a relative import for '{}'",
                name
            )))
        }
    };

    let mut base = package;
    for _ in 1..level {
        base = parent_module_path(base).ok_or_else(|| {
            LoadError::ImportConstraint(format!(
                "attempted relative import of '{}' beyond top-level package '{}'",
                name, package
            ))
        })?;
    }

    if rest.is_empty() {
        Ok(base.to_string())
    } else {
        Ok(format!("{}.{}", base, rest))
    }
}
