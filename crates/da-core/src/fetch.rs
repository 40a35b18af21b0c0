//! Fetching raw 2DA and TLK payloads by resource name

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Source of raw resource bytes.
///
/// Any failure is treated as "resource unavailable" by the callers.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the payload stored under `name`
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}

/// Fetches resources from files under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ResourceFetcher for DirectoryFetcher {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::FileRead { path, source: e })
    }
}
