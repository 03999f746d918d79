//! Top-level orchestrator for one ZIP-based container.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::{
    DATAPACKAGE_JSON, EXTRA_PAGES_JSONL, MAIN_PAGES_JSONL, MAX_FULL_DOWNLOAD_SIZE, PAGES_CSV,
    WEBARCHIVE_YAML, load_pages,
};
use crate::error::{ArchiveError, Result};
use crate::lines::LineReader;
use crate::reader::{ContainerEntry, EntrySource, RecordParser};
use crate::records::{Metadata, PageRecord};
use crate::storage::Storage;

/// Advisory progress callback: `(percent, offset, total)`.
pub type ProgressFn = dyn Fn(u32, u64, u64) + Send + Sync;

/// Load-time options for one container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaczConfig {
    /// Container identity used when registering entries and tagging pages.
    pub load_url: String,
    /// Lazy mode: register the container for range access instead of
    /// ingesting all captures.
    pub on_demand: bool,
    /// Fallback title when the legacy descriptor supplies none.
    pub source_name: String,
}

/// Which descriptor the container carries, decided once per load.
enum Schema {
    Package,
    Legacy,
    None,
}

/// Loader for a single ZIP-based container.
///
/// Generic over nothing but trait objects: the range reader, the storage
/// sink and the capture-record parser are all collaborators injected by the
/// host.
pub struct WaczLoader {
    reader: Arc<dyn EntrySource>,
    config: WaczConfig,
    record_parser: Option<Arc<dyn RecordParser>>,
}

impl WaczLoader {
    pub fn new(
        reader: Arc<dyn EntrySource>,
        config: WaczConfig,
        record_parser: Option<Arc<dyn RecordParser>>,
    ) -> Self {
        Self {
            reader,
            config,
            record_parser,
        }
    }

    /// Load the container: extract metadata, then either register it for
    /// on-demand access or ingest every capture entry.
    ///
    /// `full_total_size` scales the single global progress percentage
    /// reported across all capture entries. Containers without any
    /// recognized descriptor load with empty metadata.
    pub async fn load(
        &self,
        db: &Arc<dyn Storage>,
        progress: Option<&ProgressFn>,
        full_total_size: u64,
    ) -> Result<Metadata> {
        let entries = self.reader.entries().await?;

        // Small fully-buffered origins are worth keeping around whole for
        // later direct reuse. Optimization only.
        if self.config.on_demand {
            if let Some(raw) = self.reader.full_buffer() {
                if raw.len() as u64 <= MAX_FULL_DOWNLOAD_SIZE {
                    db.stash_archive_buffer(raw.to_vec()).await?;
                }
            }
        }

        let names: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();

        let schema = if names.contains(DATAPACKAGE_JSON) {
            Schema::Package
        } else if names.contains(WEBARCHIVE_YAML) {
            Schema::Legacy
        } else {
            Schema::None
        };

        let metadata = match schema {
            Schema::Package => self.load_package_metadata(db, &names).await?,
            Schema::Legacy => self.load_legacy_metadata(db, &names).await?,
            Schema::None => Metadata::default(),
        };

        if self.config.on_demand {
            db.add_wacz_file(&self.config.load_url, entries).await?;
        } else {
            self.load_full(db, &entries, progress, full_total_size).await?;
        }

        Ok(metadata)
    }

    /// Current schema: JSON package descriptor.
    async fn load_package_metadata(
        &self,
        db: &Arc<dyn Storage>,
        names: &HashSet<&str>,
    ) -> Result<Metadata> {
        let text = self.reader.read_entry(DATAPACKAGE_JSON).await?;
        let root: PackageDescriptor = serde_json::from_slice(&text)
            .map_err(|e| ArchiveError::format(DATAPACKAGE_JSON, e))?;

        if let Some(config) = root.config {
            db.init_config(config).await?;
        }

        let mut metadata = root.metadata.unwrap_or_default();

        if names.contains(MAIN_PAGES_JSONL) {
            let stream = self.reader.open_entry(MAIN_PAGES_JSONL, true).await?;
            let mut lines = LineReader::new(stream);
            let info = load_pages(db.as_ref(), &mut lines, Some(&self.config.load_url)).await?;
            if info.has_text {
                metadata.text_index = Some(MAIN_PAGES_JSONL.to_string());
            }
        }

        // The extra index, when present, wins over the main-index result.
        if names.contains(EXTRA_PAGES_JSONL) {
            metadata.text_index = Some(EXTRA_PAGES_JSONL.to_string());
        }

        Ok(metadata)
    }

    /// Legacy schema: YAML descriptor.
    async fn load_legacy_metadata(
        &self,
        db: &Arc<dyn Storage>,
        names: &HashSet<&str>,
    ) -> Result<Metadata> {
        let text = self.reader.read_entry(WEBARCHIVE_YAML).await?;
        let root: LegacyDescriptor =
            serde_yaml::from_slice(&text).map_err(|e| ArchiveError::format(WEBARCHIVE_YAML, e))?;

        let mut metadata = Metadata {
            title: root.title,
            desc: root.desc,
            ..Default::default()
        };

        let mut config = root.config;
        if let Some(text_index) = &root.text_index {
            metadata.text_index = Some(text_index.clone());
            let config = config.get_or_insert_with(|| Value::Object(Map::new()));
            if let Some(obj) = config.as_object_mut() {
                obj.insert("textIndex".to_string(), Value::String(text_index.clone()));
            }
        }
        if let Some(config) = config {
            db.init_config(config).await?;
        }

        if metadata.title.is_none() {
            metadata.title = Some(self.config.source_name.clone());
        }

        if !root.pages.is_empty() {
            db.add_pages(root.pages).await?;
        } else if names.contains(PAGES_CSV) {
            db.load_pages_csv(PAGES_CSV).await?;
        }

        if !root.page_lists.is_empty() {
            db.add_curated_page_lists(root.page_lists, "pages", "show").await?;
        }

        Ok(metadata)
    }

    /// Eager mode: ingest every capture entry, reporting one global
    /// percentage by accumulating a running byte offset across entries.
    async fn load_full(
        &self,
        db: &Arc<dyn Storage>,
        entries: &[ContainerEntry],
        progress: Option<&ProgressFn>,
        full_total_size: u64,
    ) -> Result<()> {
        let mut offset_total = 0u64;

        for entry in entries {
            let entry_total = self.reader.compressed_size(&entry.name);

            if entry.name.ends_with(".warc") || entry.name.ends_with(".warc.gz") {
                match &self.record_parser {
                    Some(parser) => {
                        let stream = self.reader.open_entry(&entry.name, true).await?;
                        let base = offset_total;
                        let report = move |offset: u64| {
                            if let Some(progress) = progress {
                                if full_total_size > 0 {
                                    let offset = base + offset;
                                    let percent = (offset as f64 * 100.0 / full_total_size as f64)
                                        .round() as u32;
                                    progress(percent, offset, full_total_size);
                                }
                            }
                        };
                        parser
                            .parse_records(Arc::clone(db), stream, &entry.name, &report, entry_total)
                            .await?;
                    }
                    None => warn!(entry = %entry.name, "no record parser; skipping capture entry"),
                }
            }

            offset_total += entry_total;
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct PackageDescriptor {
    config: Option<Value>,
    metadata: Option<Metadata>,
}

#[derive(Deserialize)]
struct LegacyDescriptor {
    title: Option<String>,
    desc: Option<String>,
    #[serde(rename = "textIndex")]
    text_index: Option<String>,
    config: Option<Value>,
    #[serde(default)]
    pages: Vec<PageRecord>,
    #[serde(default, rename = "pageLists")]
    page_lists: Vec<Value>,
}
