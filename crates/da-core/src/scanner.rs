//! Directory scanner for discovering 2DA resources

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A 2DA file found under a scan root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResource {
    /// Table name: path relative to its root, `/`-separated, without extension
    pub name: String,
    /// Resource name relative to its root, `/`-separated, with extension
    pub resource: String,
    /// Full path to the file
    pub path: PathBuf,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered tables, sorted by name
    pub tables: Vec<TableResource>,
    /// Total number of files found, including shadowed duplicates
    pub total_files: usize,
}

impl ScanResult {
    /// Find a table by name
    pub fn find_table(&self, name: &str) -> Option<&TableResource> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get all table names
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Scan one or more directories for files with the given extension.
///
/// When the same table name appears under several roots, the first root wins.
pub fn scan_directory<P: AsRef<Path>>(roots: &[P], extension: &str) -> Result<ScanResult> {
    let mut found: BTreeMap<String, (String, PathBuf)> = BTreeMap::new();
    let mut total_files = 0;

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !entry.file_type().is_file() || !has_extension(path, extension) {
                continue;
            }

            if let Some(resource) = relative_name(root, path) {
                let name = match resource.rsplit_once('.') {
                    Some((stem, _)) => stem.to_string(),
                    None => resource.clone(),
                };
                found
                    .entry(name)
                    .or_insert_with(|| (resource, path.to_path_buf()));
                total_files += 1;
            }
        }
    }

    let tables = found
        .into_iter()
        .map(|(name, (resource, path))| TableResource {
            name,
            resource,
            path,
        })
        .collect();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        tables,
        total_files,
    })
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Path relative to `root`, joined with `/`
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.iter().map(|p| p.to_str()).collect();
    Some(parts?.join("/"))
}
