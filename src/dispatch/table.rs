//! Dispatch Tables
//!
//! Static mapping from an exported attribute name to where it lives:
//! `name -> (package, module)`, where `module` is either a submodule to import
//! and read `name` from, or the `__module__` marker meaning "the submodule
//! named `name` is itself the attribute".
//!
//! ## TOML Format
//!
//! ```toml
//! [imports]
//! MyClass = ["mypackage.core", "models"]
//! join = { package = "os", module = "path" }
//! path = { package = "os", module = "__module__" }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

/// Marker selecting "import the submodule named like the attribute".
pub const MODULE_MARKER: &str = "__module__";

/// Where an exported attribute is found inside its package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ModuleMarker {
    /// The attribute is the submodule `package.<attribute>` itself.
    SelfModule,
    /// The attribute is read from submodule `package.<name>`.
    Submodule(String),
}

impl From<String> for ModuleMarker {
    fn from(name: String) -> Self {
        if name == MODULE_MARKER {
            ModuleMarker::SelfModule
        } else {
            ModuleMarker::Submodule(name)
        }
    }
}

impl From<&str> for ModuleMarker {
    fn from(name: &str) -> Self {
        ModuleMarker::from(name.to_string())
    }
}

impl fmt::Display for ModuleMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleMarker::SelfModule => f.write_str(MODULE_MARKER),
            ModuleMarker::Submodule(name) => f.write_str(name),
        }
    }
}

/// One dispatch table row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchEntry {
    /// Dotted package path the submodule is resolved against.
    pub package: String,
    /// Submodule name or the `__module__` marker.
    pub module: ModuleMarker,
}

impl DispatchEntry {
    pub fn new(package: impl Into<String>, module: impl Into<ModuleMarker>) -> Self {
        Self {
            package: package.into(),
            module: module.into(),
        }
    }
}

/// Entry forms accepted in TOML.
#[derive(Deserialize)]
#[serde(untagged)]
enum EntrySpec {
    /// `name = ["package", "module"]`
    Pair(String, String),
    /// `name = { package = "...", module = "..." }`
    Detailed(DispatchEntry),
}

impl From<EntrySpec> for DispatchEntry {
    fn from(spec: EntrySpec) -> Self {
        match spec {
            EntrySpec::Pair(package, module) => DispatchEntry::new(package, module),
            EntrySpec::Detailed(entry) => entry,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    imports: HashMap<String, EntrySpec>,
}

/// Errors from building a dispatch table.
#[derive(Debug)]
pub enum TableError {
    /// The table file could not be read.
    Io(std::io::Error),
    /// The TOML is malformed or has unexpected fields.
    Parse(toml::de::Error),
    /// A row is structurally valid but unusable.
    InvalidEntry { name: String, reason: String },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Io(err) => write!(f, "Failed to read dispatch table: {}", err),
            TableError::Parse(err) => write!(f, "Failed to parse dispatch table: {}", err),
            TableError::InvalidEntry { name, reason } => {
                write!(f, "Invalid dispatch entry '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Io(err) => Some(err),
            TableError::Parse(err) => Some(err),
            TableError::InvalidEntry { .. } => None,
        }
    }
}

/// Read-only dispatch table. Clones share the same rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    entries: Arc<HashMap<String, DispatchEntry>>,
}

impl DispatchTable {
    /// Build from `(name, (package, module))` rows.
    ///
    /// ```
    /// use lateimport::dispatch::{DispatchTable, ModuleMarker};
    ///
    /// let table = DispatchTable::new([("join", ("os", "path")), ("path", ("os", "__module__"))]);
    /// assert_eq!(table.get("path").unwrap().module, ModuleMarker::SelfModule);
    /// ```
    pub fn new<I, N, P, M>(rows: I) -> Self
    where
        I: IntoIterator<Item = (N, (P, M))>,
        N: Into<String>,
        P: Into<String>,
        M: Into<ModuleMarker>,
    {
        let entries = rows
            .into_iter()
            .map(|(name, (package, module))| (name.into(), DispatchEntry::new(package, module)))
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Parse the `[imports]` TOML form.
    pub fn from_toml_str(content: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(content).map_err(TableError::Parse)?;
        let mut entries = HashMap::with_capacity(file.imports.len());
        for (name, spec) in file.imports {
            let entry = DispatchEntry::from(spec);
            validate_entry(&name, &entry)?;
            entries.insert(name, entry);
        }
        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    /// Read and parse a TOML table file.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path).map_err(TableError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn get(&self, name: &str) -> Option<&DispatchEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Exported names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_entry(name: &str, entry: &DispatchEntry) -> Result<(), TableError> {
    if name.is_empty() || name.contains('.') {
        return Err(TableError::InvalidEntry {
            name: name.to_string(),
            reason: "attribute names must be a single non-empty identifier".to_string(),
        });
    }
    if entry.package.is_empty() {
        return Err(TableError::InvalidEntry {
            name: name.to_string(),
            reason: "package must not be empty".to_string(),
        });
    }
    if let ModuleMarker::Submodule(module) = &entry.module {
        if module.is_empty() || module.starts_with('.') {
            return Err(TableError::InvalidEntry {
                name: name.to_string(),
                reason: format!("invalid submodule name '{}'", module),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_from_string() {
        assert_eq!(ModuleMarker::from("__module__"), ModuleMarker::SelfModule);
        assert_eq!(
            ModuleMarker::from("models"),
            ModuleMarker::Submodule("models".to_string())
        );
        assert_eq!(ModuleMarker::SelfModule.to_string(), MODULE_MARKER);
    }

    #[test]
    fn test_new_table() {
        let table = DispatchTable::new([("join", ("os", "path"))]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("join"), Some(&DispatchEntry::new("os", "path")));
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn test_parse_both_entry_forms() {
        let content = r#"
            [imports]
            MyClass = ["mypackage.core", "models"]
            join = { package = "os", module = "path" }
            path = { package = "os", module = "__module__" }
        "#;

        let table = DispatchTable::from_toml_str(content).unwrap();
        assert_eq!(table.names(), vec!["MyClass", "join", "path"]);
        assert_eq!(
            table.get("MyClass"),
            Some(&DispatchEntry::new("mypackage.core", "models"))
        );
        assert_eq!(table.get("path").unwrap().module, ModuleMarker::SelfModule);
    }

    #[test]
    fn test_parse_empty_table() {
        let table = DispatchTable::from_toml_str("").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let content = r#"
            [imports]
            join = { package = "os", module = "path", lazy = true }
        "#;
        assert!(matches!(
            DispatchTable::from_toml_str(content),
            Err(TableError::Parse(_))
        ));

        assert!(matches!(
            DispatchTable::from_toml_str("[exports]\nx = 1"),
            Err(TableError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let empty_package = r#"
            [imports]
            join = ["", "path"]
        "#;
        let err = DispatchTable::from_toml_str(empty_package).unwrap_err();
        assert!(err.to_string().contains("'join'"));

        let dotted_name = r#"
            [imports]
            "a.b" = ["os", "path"]
        "#;
        assert!(matches!(
            DispatchTable::from_toml_str(dotted_name),
            Err(TableError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn test_clones_share_rows() {
        let table = DispatchTable::new([("join", ("os", "path"))]);
        let copy = table.clone();
        assert_eq!(table, copy);
        assert!(Arc::ptr_eq(&table.entries, &copy.entries));
    }
}
