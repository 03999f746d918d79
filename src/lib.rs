//! # arcdex
//!
//! Streaming record indexing and byte-accurate payload extraction for
//! web-archive containers.
//!
//! This library ingests two archive families, the ZIP-based WACZ container
//! (current JSON and legacy YAML metadata schemas) and the clustered
//! single-file ZIM-like format, and produces a normalized record index
//! through a pluggable storage sink, plus on-demand payload retrieval that
//! pulls exact byte windows out of compressed clusters without fully
//! decompressing them. It is built for replay/viewer applications that
//! browse archived captures without materializing an entire archive in
//! memory.
//!
//! ## Features
//!
//! - Descriptor-schema dispatch for ZIP-based containers (current JSON vs
//!   legacy YAML), with eager full ingestion or lazy on-demand registration
//! - Bounded-memory, batched line-oriented ingestion for page indexes and
//!   clustered text indexes
//! - Windowed streaming decompression: an exact `[offset, offset+length)`
//!   slice of a cluster's decompressed form, stopping as soon as the window
//!   is satisfied, with XZ and DEFLATE engines included
//! - All collaborators (range reader, WARC parser, storage backend,
//!   decompression engine) injected through traits
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use arcdex::{MemEntrySource, MemStorage, Storage, WaczConfig, WaczLoader};
//!
//! #[tokio::main]
//! async fn main() -> arcdex::Result<()> {
//!     // Any range-capable reader works; an in-memory one keeps it simple.
//!     let source = Arc::new(MemEntrySource::new([
//!         ("datapackage.json", br#"{"metadata":{"title":"My Capture"}}"#.to_vec()),
//!     ]));
//!
//!     let config = WaczConfig {
//!         load_url: "my.wacz".to_string(),
//!         on_demand: true,
//!         source_name: "my.wacz".to_string(),
//!     };
//!
//!     let loader = WaczLoader::new(source, config, None);
//!     let db: Arc<dyn Storage> = Arc::new(MemStorage::new());
//!
//!     let metadata = loader.load(&db, None, 0).await?;
//!     println!("loaded: {:?}", metadata.title);
//!     Ok(())
//! }
//! ```

pub mod decomp;
pub mod error;
pub mod lines;
pub mod reader;
pub mod records;
pub mod storage;
pub mod wacz;
pub mod zim;

pub use decomp::{DecompressSession, Decompression, DeflateDecompression, Step, XzDecompression};
pub use error::{ArchiveError, Result};
pub use lines::LineReader;
pub use reader::{ContainerEntry, EntrySource, EntryStream, MemEntrySource, RecordParser};
pub use records::{CdxLine, Metadata, MimeTable, PageListInfo, PageRecord, Record, RecordSource};
pub use storage::{MemStorage, Storage};
pub use wacz::{MultiWaczLoader, MultiWaczManifest, ProgressFn, WaczConfig, WaczLoader, load_pages};
pub use zim::{PayloadEntry, ZimIndexBuilder, ZimPayloadExtractor};
