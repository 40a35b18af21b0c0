//! Configuration: string table resource names and column roles per table kind

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Columns holding string references unless a table kind overrides them
pub const DEFAULT_REFERENCE_COLUMNS: &[&str] = &[
    "Name",
    "SpellDesc",
    "FEAT",
    "DESCRIPTION",
    "STRING_REF",
    "NAME",
    "AltMessage",
    "Label",
    "StrRef",
];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resource names of the two TLK payloads
    pub string_tables: StringTableNames,
    /// Suffix appended to a table name to get its resource name
    pub table_extension: String,
    /// Reference columns keyed by table kind
    pub column_roles: ColumnRoleMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            string_tables: StringTableNames::default(),
            table_extension: "2da".to_string(),
            column_roles: ColumnRoleMap::default(),
        }
    }
}

impl Config {
    /// Load a configuration file; fields missing from it keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the configuration as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resource name for a table, e.g. `feat` -> `feat.2da`
    pub fn resource_name(&self, table: &str) -> String {
        let has_extension = table
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.table_extension));
        if self.table_extension.is_empty() || has_extension {
            table.to_string()
        } else {
            format!("{}.{}", table, self.table_extension)
        }
    }
}

/// Resource names of the standard and custom TLK payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringTableNames {
    pub standard: String,
    pub custom: String,
}

impl Default for StringTableNames {
    fn default() -> Self {
        Self {
            standard: "dialog.tlk.json".to_string(),
            custom: "custom.tlk.json".to_string(),
        }
    }
}

/// Reference column lists keyed by table kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRoleMap {
    /// Used for every table kind without an entry in `tables`
    pub default: Vec<String>,
    pub tables: BTreeMap<String, Vec<String>>,
}

impl Default for ColumnRoleMap {
    fn default() -> Self {
        Self {
            default: DEFAULT_REFERENCE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            tables: BTreeMap::new(),
        }
    }
}

impl ColumnRoleMap {
    /// Column roles for a table kind
    pub fn for_table(&self, kind: &str) -> ColumnRoles {
        let columns = self.tables.get(kind).unwrap_or(&self.default);
        ColumnRoles::new(columns.iter().cloned())
    }
}

/// The set of reference columns used while decoding one table.
///
/// Matching is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    references: HashSet<String>,
}

impl ColumnRoles {
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            references: references.into_iter().map(Into::into).collect(),
        }
    }

    /// No reference columns at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_reference(&self, column: &str) -> bool {
        self.references.contains(column)
    }
}
