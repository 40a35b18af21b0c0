//! String-reference resolution against the standard and custom TLK tables
//!
//! Ids below [`CUSTOM_OFFSET`] index the standard table directly. Ids at or
//! above it index the custom table after subtracting the offset. Anything
//! that cannot be resolved falls back to its literal numeral.

use crate::error::Result;
use crate::fetch::ResourceFetcher;
use crate::strings::StringTable;
use crate::table::CellValue;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// First id of the custom string space
pub const CUSTOM_OFFSET: u64 = 16_777_216;

/// Lifecycle of a [`StringResolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverStatus {
    Uninitialized,
    Loading,
    Ready,
    /// Loading failed; both tables are empty for the rest of the process
    ReadyWithFallback,
}

impl ResolverStatus {
    /// True for `Ready` and `ReadyWithFallback`
    pub fn is_settled(self) -> bool {
        matches!(self, ResolverStatus::Ready | ResolverStatus::ReadyWithFallback)
    }
}

#[derive(Debug, Default)]
struct Tables {
    standard: StringTable,
    custom: StringTable,
    fallback: bool,
}

impl Tables {
    fn fallback() -> Self {
        Self {
            fallback: true,
            ..Self::default()
        }
    }

    fn lookup(&self, id: u64) -> Option<&str> {
        if id >= CUSTOM_OFFSET {
            self.custom.get(id - CUSTOM_OFFSET)
        } else {
            self.standard.get(id)
        }
    }
}

struct Source {
    fetcher: Arc<dyn ResourceFetcher>,
    standard: String,
    custom: String,
}

impl Source {
    async fn load(&self) -> Result<Tables> {
        let (standard, custom) = tokio::try_join!(
            self.fetcher.fetch(&self.standard),
            self.fetcher.fetch(&self.custom),
        )?;

        Ok(Tables {
            standard: StringTable::from_payload(&self.standard, &standard)?,
            custom: StringTable::from_payload(&self.custom, &custom)?,
            fallback: false,
        })
    }
}

/// Resolves numeric string references to text.
///
/// The two string tables are loaded once, on the first call to
/// [`ensure_ready`](Self::ensure_ready). Concurrent callers share that single
/// load. After it settles the resolver never changes again, so share it
/// behind an `Arc`.
pub struct StringResolver {
    source: Option<Source>,
    tables: OnceCell<Tables>,
    loading: AtomicBool,
}

impl StringResolver {
    /// Create a resolver that loads `standard` and `custom` through `fetcher`
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        standard: impl Into<String>,
        custom: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(Source {
                fetcher,
                standard: standard.into(),
                custom: custom.into(),
            }),
            tables: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// Create a resolver that is already ready with the given tables
    pub fn settled(standard: StringTable, custom: StringTable) -> Self {
        Self {
            source: None,
            tables: OnceCell::new_with(Some(Tables {
                standard,
                custom,
                fallback: false,
            })),
            loading: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> ResolverStatus {
        match self.tables.get() {
            Some(tables) if tables.fallback => ResolverStatus::ReadyWithFallback,
            Some(_) => ResolverStatus::Ready,
            None if self.loading.load(Ordering::Acquire) => ResolverStatus::Loading,
            None => ResolverStatus::Uninitialized,
        }
    }

    /// Load the string tables if that has not happened yet and wait for the
    /// load to settle. Never fails; a failed load leaves the resolver in
    /// fallback mode.
    pub async fn ensure_ready(&self) -> ResolverStatus {
        self.tables.get_or_init(|| self.load()).await;
        self.status()
    }

    async fn load(&self) -> Tables {
        self.loading.store(true, Ordering::Release);

        let Some(source) = &self.source else {
            return Tables::fallback();
        };

        debug!(standard = %source.standard, custom = %source.custom, "loading string tables");
        match source.load().await {
            Ok(tables) => {
                info!(
                    standard = tables.standard.len(),
                    custom = tables.custom.len(),
                    "string tables loaded"
                );
                tables
            }
            Err(e) => {
                warn!(error = %e, "string tables unavailable, references stay literal");
                Tables::fallback()
            }
        }
    }

    /// Resolve a reference given as text.
    ///
    /// Returns the input unchanged when the resolver has not settled, when it
    /// is not a non-negative integer, or when the id is unknown.
    pub fn resolve(&self, raw: &str) -> String {
        let Some(tables) = self.tables.get() else {
            return raw.to_string();
        };

        parse_reference(raw)
            .and_then(|id| tables.lookup(id))
            .map_or_else(|| raw.to_string(), str::to_string)
    }

    /// Resolve a numeric reference id
    pub fn resolve_id(&self, id: u64) -> String {
        self.tables
            .get()
            .and_then(|tables| tables.lookup(id))
            .map_or_else(|| id.to_string(), str::to_string)
    }

    /// Resolve a reference held in a decoded cell
    pub fn resolve_value(&self, value: &CellValue) -> String {
        match value {
            CellValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64 => {
                self.resolve_id(*n as u64)
            }
            CellValue::Number(_) => value.to_string(),
            CellValue::Text(s) => self.resolve(s),
        }
    }
}

impl std::fmt::Debug for StringResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringResolver")
            .field("status", &self.status())
            .finish()
    }
}

/// Parse a string consisting solely of ASCII digits
fn parse_reference(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// In-memory fetcher that counts fetches per resource name
    #[derive(Default)]
    struct CountingFetcher {
        payloads: HashMap<String, Vec<u8>>,
        counts: Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl CountingFetcher {
        fn with(mut self, name: &str, payload: &str) -> Self {
            self.payloads.insert(name.to_string(), payload.as_bytes().to_vec());
            self
        }

        fn count(&self, name: &str) -> usize {
            self.counts.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ResourceFetcher for CountingFetcher {
        async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
            *self.counts.lock().unwrap().entry(name.to_string()).or_default() += 1;
            self.total.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.payloads
                .get(name)
                .cloned()
                .ok_or_else(|| Error::ResourceUnavailable {
                    name: name.to_string(),
                    message: "not found".to_string(),
                })
        }
    }

    fn sample_fetcher() -> CountingFetcher {
        CountingFetcher::default()
            .with("dialog", r#"[{"id": 500, "text": "Longsword"}]"#)
            .with("custom", r#"[{"id": 1, "text": "CustomSword"}]"#)
    }

    fn sample_resolver() -> StringResolver {
        StringResolver::settled(
            StringTable::from_entries(vec![(500, "Longsword".to_string())]),
            StringTable::from_entries(vec![(1, "CustomSword".to_string())]),
        )
    }

    #[test]
    fn test_resolve_standard_and_custom() {
        let resolver = sample_resolver();
        assert_eq!(resolver.resolve("500"), "Longsword");
        assert_eq!(resolver.resolve("16777217"), "CustomSword");
        assert_eq!(resolver.resolve("999"), "999");
    }

    #[test]
    fn test_custom_offset_boundary() {
        let resolver = StringResolver::settled(
            StringTable::from_entries(vec![(CUSTOM_OFFSET - 1, "last standard".to_string())]),
            StringTable::from_entries(vec![(0, "first custom".to_string())]),
        );
        assert_eq!(resolver.resolve("16777215"), "last standard");
        assert_eq!(resolver.resolve("16777216"), "first custom");
    }

    #[test]
    fn test_resolve_non_numeric_unchanged() {
        let resolver = sample_resolver();
        assert_eq!(resolver.resolve("abc"), "abc");
        assert_eq!(resolver.resolve("-500"), "-500");
        assert_eq!(resolver.resolve("5.0"), "5.0");
        assert_eq!(resolver.resolve(""), "");
        assert_eq!(resolver.resolve("99999999999999999999999"), "99999999999999999999999");
    }

    #[test]
    fn test_resolve_values() {
        let resolver = sample_resolver();
        assert_eq!(resolver.resolve_value(&CellValue::Number(500.0)), "Longsword");
        assert_eq!(resolver.resolve_value(&CellValue::Number(16777217.0)), "CustomSword");
        assert_eq!(resolver.resolve_value(&CellValue::Number(-1.0)), "-1");
        assert_eq!(resolver.resolve_value(&CellValue::Number(2.5)), "2.5");
        assert_eq!(resolver.resolve_value(&CellValue::text("500")), "Longsword");
        assert_eq!(resolver.resolve_id(999), "999");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = sample_resolver();
        let first = resolver.resolve("500");
        let second = resolver.resolve("500");
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsettled_resolver_returns_input() {
        let resolver = StringResolver::new(Arc::new(sample_fetcher()), "dialog", "custom");
        assert_eq!(resolver.status(), ResolverStatus::Uninitialized);
        assert_eq!(resolver.resolve("500"), "500");
    }

    #[tokio::test]
    async fn test_ensure_ready_loads_tables() {
        let resolver = StringResolver::new(Arc::new(sample_fetcher()), "dialog", "custom");
        assert_eq!(resolver.ensure_ready().await, ResolverStatus::Ready);
        assert_eq!(resolver.resolve("500"), "Longsword");
        assert_eq!(resolver.resolve("16777217"), "CustomSword");
    }

    #[tokio::test]
    async fn test_concurrent_initialization_fetches_once() {
        let fetcher = Arc::new(sample_fetcher());
        let resolver = StringResolver::new(fetcher.clone(), "dialog", "custom");

        let (a, b) = tokio::join!(resolver.ensure_ready(), resolver.ensure_ready());
        assert_eq!(a, ResolverStatus::Ready);
        assert_eq!(b, ResolverStatus::Ready);
        assert_eq!(fetcher.count("dialog"), 1);
        assert_eq!(fetcher.count("custom"), 1);

        resolver.ensure_ready().await;
        assert_eq!(fetcher.total.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_falls_back_without_retry() {
        let fetcher = Arc::new(
            CountingFetcher::default().with("dialog", r#"[{"id": 500, "text": "Longsword"}]"#),
        );
        let resolver = StringResolver::new(fetcher.clone(), "dialog", "custom");

        assert_eq!(resolver.ensure_ready().await, ResolverStatus::ReadyWithFallback);
        assert_eq!(resolver.resolve("500"), "500");

        assert_eq!(resolver.ensure_ready().await, ResolverStatus::ReadyWithFallback);
        assert_eq!(fetcher.count("custom"), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_back() {
        let fetcher = Arc::new(
            CountingFetcher::default()
                .with("dialog", "{ not json")
                .with("custom", "[]"),
        );
        let resolver = StringResolver::new(fetcher, "dialog", "custom");

        assert_eq!(resolver.ensure_ready().await, ResolverStatus::ReadyWithFallback);
        assert_eq!(resolver.resolve("16777216"), "16777216");
    }
}
