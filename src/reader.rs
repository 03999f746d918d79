//! Boundary traits for the container reader and the capture-record parser.
//!
//! The range-capable ZIP reader and the WARC parser are collaborators of
//! this crate, not part of it. The loaders only rely on the contracts here:
//! a source of named entry streams, and a parser that drains one capture
//! entry into storage while reporting byte progress.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;
use crate::storage::Storage;

/// A stream over one container entry's bytes.
pub type EntryStream = Box<dyn AsyncRead + Send + Unpin>;

/// A named entry inside a ZIP-based container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerEntry {
    pub name: String,
    pub compressed_size: u64,
    /// Byte offset of the entry's data within the container.
    pub offset: u64,
}

/// Range-capable source of named entry streams.
///
/// Implemented by the ZIP range reader bound to the container's origin
/// (local file, remote URL, in-memory buffer). All loaders in this crate
/// consume containers exclusively through this trait.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// List all entries in the container.
    async fn entries(&self) -> Result<Vec<ContainerEntry>>;

    /// Open one entry as a byte stream, inflating it when `inflate` is set.
    async fn open_entry(&self, name: &str, inflate: bool) -> Result<EntryStream>;

    /// Read one entry fully into memory (descriptors are small).
    async fn read_entry(&self, name: &str) -> Result<Vec<u8>>;

    /// Compressed size of an entry, 0 when unknown.
    fn compressed_size(&self, name: &str) -> u64;

    /// The raw archive bytes, when the origin is a fully-buffered one.
    fn full_buffer(&self) -> Option<&[u8]> {
        None
    }
}

/// Parser for raw capture-record (WARC) entries.
///
/// `progress` is called with a byte offset within the entry being parsed;
/// it is advisory and may be invoked zero or many times.
#[async_trait]
pub trait RecordParser: Send + Sync {
    async fn parse_records(
        &self,
        db: Arc<dyn Storage>,
        source: EntryStream,
        name: &str,
        progress: &(dyn Fn(u64) + Send + Sync),
        total: u64,
    ) -> Result<()>;
}

/// In-memory entry source, for tests and small embedded archives.
///
/// Entries are stored already decompressed, so `inflate` is a no-op and
/// `compressed_size` reports the stored length.
pub struct MemEntrySource {
    entries: Vec<ContainerEntry>,
    files: HashMap<String, Vec<u8>>,
    retain_buffer: bool,
    raw: Vec<u8>,
}

impl MemEntrySource {
    pub fn new(files: impl IntoIterator<Item = (impl Into<String>, Vec<u8>)>) -> Self {
        let mut entries = Vec::new();
        let mut map = HashMap::new();
        let mut offset = 0u64;
        for (name, data) in files {
            let name = name.into();
            entries.push(ContainerEntry {
                name: name.clone(),
                compressed_size: data.len() as u64,
                offset,
            });
            offset += data.len() as u64;
            map.insert(name, data);
        }
        Self {
            entries,
            files: map,
            retain_buffer: false,
            raw: Vec::new(),
        }
    }

    /// Expose `raw` through [`EntrySource::full_buffer`], simulating an
    /// origin backed by a single in-memory buffer.
    pub fn with_full_buffer(mut self, raw: Vec<u8>) -> Self {
        self.retain_buffer = true;
        self.raw = raw;
        self
    }
}

#[async_trait]
impl EntrySource for MemEntrySource {
    async fn entries(&self) -> Result<Vec<ContainerEntry>> {
        Ok(self.entries.clone())
    }

    async fn open_entry(&self, name: &str, _inflate: bool) -> Result<EntryStream> {
        let data = self.read_entry(name).await?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    async fn read_entry(&self, name: &str) -> Result<Vec<u8>> {
        self.files.get(name).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no entry '{name}'")).into()
        })
    }

    fn compressed_size(&self, name: &str) -> u64 {
        self.files.get(name).map_or(0, |d| d.len() as u64)
    }

    fn full_buffer(&self) -> Option<&[u8]> {
        self.retain_buffer.then_some(self.raw.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mem_source_lists_and_reads() {
        let source = MemEntrySource::new([("a.txt", b"hello".to_vec()), ("b.txt", b"yo".to_vec())]);

        let entries = source.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].compressed_size, 5);
        assert_eq!(entries[1].offset, 5);

        assert_eq!(source.read_entry("a.txt").await.unwrap(), b"hello");
        assert_eq!(source.compressed_size("b.txt"), 2);
        assert_eq!(source.compressed_size("missing"), 0);
        assert!(source.read_entry("missing").await.is_err());
        assert!(source.full_buffer().is_none());
    }
}
