//! Storage sink consumed by the ingestion pipelines.
//!
//! The persistent index backend lives outside this crate; the loaders only
//! need the hook surface below. Batches are handed over in stream order and
//! records are immutable once written, so re-ingesting the same stream into
//! a fresh sink must be idempotent; deduplication, if any, is the sink's
//! own business.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::reader::ContainerEntry;
use crate::records::{PageRecord, Record};

/// Hook surface of the persistent record index.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Bulk-insert one batch of page records.
    async fn add_pages(&self, pages: Vec<PageRecord>) -> Result<()>;

    /// Bulk-insert one batch of canonical records (clustered format).
    async fn add_resources(&self, resources: Vec<Record>) -> Result<()>;

    /// Apply a container-supplied configuration object.
    async fn init_config(&self, config: Value) -> Result<()>;

    /// Load a legacy CSV page list from the named entry.
    async fn load_pages_csv(&self, entry_name: &str) -> Result<()>;

    /// Store curated page lists under fixed category labels.
    async fn add_curated_page_lists(
        &self,
        lists: Vec<Value>,
        page_key: &str,
        show_key: &str,
    ) -> Result<()>;

    /// Register a container for later on-demand range access.
    async fn add_wacz_file(&self, name: &str, entries: Vec<ContainerEntry>) -> Result<()>;

    /// Synchronize against a resolved multi-container URL list.
    async fn sync_wacz(&self, urls: Vec<String>) -> Result<()>;

    /// Retain the raw archive bytes of a small fully-buffered origin.
    ///
    /// An optimization hook, not a correctness requirement.
    async fn stash_archive_buffer(&self, _raw: Vec<u8>) -> Result<()> {
        Ok(())
    }
}

/// In-memory storage sink that records every call, for testing.
///
/// All state sits behind [`RwLock`]s so the trait methods work on `&self`
/// without external synchronisation.
#[derive(Default)]
pub struct MemStorage {
    pages: RwLock<Vec<Vec<PageRecord>>>,
    resources: RwLock<Vec<Vec<Record>>>,
    configs: RwLock<Vec<Value>>,
    csv_loads: RwLock<Vec<String>>,
    curated: RwLock<Vec<(Vec<Value>, String, String)>>,
    wacz_files: RwLock<Vec<(String, Vec<ContainerEntry>)>>,
    synced: RwLock<Vec<Vec<String>>>,
    stashed: RwLock<Vec<Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page batches, in submission order.
    pub async fn page_batches(&self) -> Vec<Vec<PageRecord>> {
        self.pages.read().await.clone()
    }

    /// Record batches, in submission order.
    pub async fn resource_batches(&self) -> Vec<Vec<Record>> {
        self.resources.read().await.clone()
    }

    /// All records across batches, flattened in order.
    pub async fn all_resources(&self) -> Vec<Record> {
        self.resources.read().await.iter().flatten().cloned().collect()
    }

    pub async fn configs(&self) -> Vec<Value> {
        self.configs.read().await.clone()
    }

    pub async fn csv_loads(&self) -> Vec<String> {
        self.csv_loads.read().await.clone()
    }

    pub async fn curated(&self) -> Vec<(Vec<Value>, String, String)> {
        self.curated.read().await.clone()
    }

    pub async fn wacz_files(&self) -> Vec<(String, Vec<ContainerEntry>)> {
        self.wacz_files.read().await.clone()
    }

    pub async fn synced(&self) -> Vec<Vec<String>> {
        self.synced.read().await.clone()
    }

    pub async fn stashed(&self) -> Vec<Vec<u8>> {
        self.stashed.read().await.clone()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn add_pages(&self, pages: Vec<PageRecord>) -> Result<()> {
        self.pages.write().await.push(pages);
        Ok(())
    }

    async fn add_resources(&self, resources: Vec<Record>) -> Result<()> {
        self.resources.write().await.push(resources);
        Ok(())
    }

    async fn init_config(&self, config: Value) -> Result<()> {
        self.configs.write().await.push(config);
        Ok(())
    }

    async fn load_pages_csv(&self, entry_name: &str) -> Result<()> {
        self.csv_loads.write().await.push(entry_name.to_string());
        Ok(())
    }

    async fn add_curated_page_lists(
        &self,
        lists: Vec<Value>,
        page_key: &str,
        show_key: &str,
    ) -> Result<()> {
        self.curated
            .write()
            .await
            .push((lists, page_key.to_string(), show_key.to_string()));
        Ok(())
    }

    async fn add_wacz_file(&self, name: &str, entries: Vec<ContainerEntry>) -> Result<()> {
        self.wacz_files.write().await.push((name.to_string(), entries));
        Ok(())
    }

    async fn sync_wacz(&self, urls: Vec<String>) -> Result<()> {
        self.synced.write().await.push(urls);
        Ok(())
    }

    async fn stash_archive_buffer(&self, raw: Vec<u8>) -> Result<()> {
        self.stashed.write().await.push(raw);
        Ok(())
    }
}
