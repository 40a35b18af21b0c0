//! Loading named 2DA tables with string references resolved

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::ResourceFetcher;
use crate::parser::{decode_with_report, DecodeReport};
use crate::resolver::StringResolver;
use crate::table::TableData;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches and decodes tables, sharing one [`StringResolver`] across loads.
///
/// Loads of different tables may run concurrently; they all wait on the
/// same string table initialization.
pub struct TableLoader {
    fetcher: Arc<dyn ResourceFetcher>,
    resolver: Arc<StringResolver>,
    config: Config,
}

impl TableLoader {
    /// Create a loader whose resolver reads the configured string tables
    /// through the same fetcher
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, config: Config) -> Self {
        let resolver = Arc::new(StringResolver::new(
            fetcher.clone(),
            config.string_tables.standard.clone(),
            config.string_tables.custom.clone(),
        ));
        Self::with_resolver(fetcher, resolver, config)
    }

    /// Create a loader around an existing resolver
    pub fn with_resolver(
        fetcher: Arc<dyn ResourceFetcher>,
        resolver: Arc<StringResolver>,
        config: Config,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            config,
        }
    }

    pub fn resolver(&self) -> &Arc<StringResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load and decode the table `name`
    pub async fn load(&self, name: &str) -> Result<TableData> {
        self.load_with_report(name).await.map(|report| report.table)
    }

    /// Load and decode the table `name`, reporting skipped rows
    pub async fn load_with_report(&self, name: &str) -> Result<DecodeReport> {
        let resource = self.config.resource_name(name);
        debug!(table = name, resource = %resource, "loading table");

        let (_, fetched) = tokio::join!(
            self.resolver.ensure_ready(),
            self.fetcher.fetch(&resource)
        );
        let bytes = fetched.map_err(|e| Error::ResourceUnavailable {
            name: resource.clone(),
            message: e.to_string(),
        })?;

        let text = String::from_utf8_lossy(&bytes);
        let roles = self.config.column_roles.for_table(table_kind(name));
        Ok(decode_with_report(&text, &roles, &self.resolver))
    }

    /// Load the table `name`, yielding an empty table if it is unavailable
    pub async fn load_or_empty(&self, name: &str) -> TableData {
        match self.load(name).await {
            Ok(table) => table,
            Err(e) => {
                warn!(table = name, error = %e, "table unavailable");
                TableData::empty()
            }
        }
    }
}

/// Table kind used to pick column roles: the file stem of the name
pub fn table_kind(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::DirectoryFetcher;
    use crate::resolver::ResolverStatus;
    use crate::table::CellValue;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryFetcher {
        payloads: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl MemoryFetcher {
        fn with(mut self, name: &str, payload: &str) -> Self {
            self.payloads.insert(name.to_string(), payload.to_string());
            self
        }

        fn fetch_count(&self, name: &str) -> usize {
            self.fetched
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.as_str() == name)
                .count()
        }
    }

    #[async_trait]
    impl ResourceFetcher for MemoryFetcher {
        async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
            self.fetched.lock().unwrap().push(name.to_string());
            tokio::task::yield_now().await;
            self.payloads
                .get(name)
                .map(|p| p.as_bytes().to_vec())
                .ok_or_else(|| Error::ResourceUnavailable {
                    name: name.to_string(),
                    message: "not found".to_string(),
                })
        }
    }

    fn game_data() -> MemoryFetcher {
        MemoryFetcher::default()
            .with(
                "dialog.tlk.json",
                r#"[{"id": 500, "text": "Longsword"}, {"id": 501, "text": "Dagger"}]"#,
            )
            .with("custom.tlk.json", r#"[{"id": 1, "text": "CustomSword"}]"#)
            .with(
                "baseitems.2da",
                "2DA V2.0\n\nLABEL Name COST\n0 sword 500 10\n1 custom 16777217 25.5\n",
            )
            .with("feat.2da", "2DA V2.0\n\nLABEL FEAT\n0 dagger 501\n1 **** 500\n")
    }

    #[tokio::test]
    async fn test_load_resolves_references() {
        let loader = TableLoader::new(Arc::new(game_data()), Config::default());
        let table = loader.load("baseitems").await.unwrap();

        assert_eq!(table.columns, vec!["ID", "LABEL", "Name", "COST"]);
        assert_eq!(table.rows[0].value("Name"), Some(&CellValue::text("Longsword")));
        assert_eq!(table.rows[1].value("Name"), Some(&CellValue::text("CustomSword")));
        assert_eq!(table.rows[1].value("COST"), Some(&CellValue::Number(25.5)));
        assert_eq!(loader.resolver().status(), ResolverStatus::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_initialization() {
        let fetcher = Arc::new(game_data());
        let loader = TableLoader::new(fetcher.clone(), Config::default());

        let (items, feats) = tokio::join!(loader.load("baseitems"), loader.load("feat"));
        let items = items.unwrap();
        let feats = feats.unwrap();

        assert_eq!(fetcher.fetch_count("dialog.tlk.json"), 1);
        assert_eq!(fetcher.fetch_count("custom.tlk.json"), 1);
        assert_eq!(items.rows[0].value("Name"), Some(&CellValue::text("Longsword")));
        assert_eq!(feats.rows[0].value("FEAT"), Some(&CellValue::text("Dagger")));
        assert_eq!(feats.row_count(), 1);

        loader.load("feat").await.unwrap();
        assert_eq!(fetcher.fetch_count("dialog.tlk.json"), 1);
    }

    #[tokio::test]
    async fn test_missing_string_tables_keep_numerals() {
        let fetcher = MemoryFetcher::default().with("feat.2da", "LABEL FEAT\n0 dagger 501\n");
        let loader = TableLoader::new(Arc::new(fetcher), Config::default());

        let table = loader.load("feat").await.unwrap();
        assert_eq!(table.rows[0].value("FEAT"), Some(&CellValue::text("501")));
        assert_eq!(loader.resolver().status(), ResolverStatus::ReadyWithFallback);
    }

    #[tokio::test]
    async fn test_unavailable_table() {
        let loader = TableLoader::new(Arc::new(game_data()), Config::default());

        let err = loader.load("spells").await.unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable { ref name, .. } if name == "spells.2da"));
        assert_eq!(loader.load_or_empty("spells").await, TableData::empty());
    }

    #[tokio::test]
    async fn test_table_kind_roles() {
        let mut config = Config::default();
        config
            .column_roles
            .tables
            .insert("baseitems".to_string(), vec!["COST".to_string()]);
        let loader = TableLoader::new(Arc::new(game_data()), config);

        let report = loader.load_with_report("baseitems").await.unwrap();
        let row = &report.table.rows[0];
        assert_eq!(row.value("Name"), Some(&CellValue::Number(500.0)));
        assert_eq!(row.value("COST"), Some(&CellValue::text("10")));
        assert_eq!(report.skipped_rows, 0);
    }

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("dialog.tlk.json"),
            r#"{"strings": [{"id": 7, "text": "Fireball"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("custom.tlk.json"), "id,text\n3,Custom Bolt\n").unwrap();
        fs::write(
            dir.path().join("spells.2da"),
            "2DA V2.0\n\nLabel SpellDesc\n0 \"Fire ball\" 7\n1 bolt 16777219\n",
        )
        .unwrap();

        let loader = TableLoader::new(
            Arc::new(DirectoryFetcher::new(dir.path())),
            Config::default(),
        );
        let table = loader.load("spells").await.unwrap();

        assert_eq!(table.rows[0].value("Label"), Some(&CellValue::text("Fire ball")));
        assert_eq!(table.rows[0].value("SpellDesc"), Some(&CellValue::text("Fireball")));
        assert_eq!(table.rows[1].value("SpellDesc"), Some(&CellValue::text("Custom Bolt")));
    }

    #[test]
    fn test_table_kind() {
        assert_eq!(table_kind("feat"), "feat");
        assert_eq!(table_kind("feat.2da"), "feat");
        assert_eq!(table_kind("dlc/feat"), "feat");
    }
}
