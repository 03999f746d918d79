//! Error taxonomy for archive loading, indexing and payload extraction.
//!
//! The variants map one-to-one to the failure classes the loaders
//! distinguish between:
//!
//! - [`ArchiveError::Format`]: a malformed descriptor document. Fatal for
//!   that container's metadata load.
//! - [`ArchiveError::LineParse`]: a malformed JSON line in a page-index
//!   stream. Fatal there (one JSON object per line is guaranteed by the
//!   format); the clustered text-index path instead logs and skips bad
//!   lines, since those are expected to be heterogeneous.
//! - [`ArchiveError::Decompression`]: the decompression engine failed
//!   mid-stream. The payload extractor downgrades this to end-of-stream.
//! - [`ArchiveError::StorageWrite`]: a batch submission was rejected by the
//!   storage sink. Late rejections are logged after the fact rather than
//!   re-raised, since earlier batches have already committed.

use thiserror::Error;

/// The primary error type for all operations in the `arcdex` crate.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An I/O error from the underlying byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A descriptor document (JSON or YAML) failed to parse.
    #[error("malformed descriptor '{entry}': {source}")]
    Format {
        entry: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A line that must be a single JSON object failed to parse.
    #[error("malformed index line: {source}")]
    LineParse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The decompression engine reported a failure.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// The storage sink rejected a write.
    #[error("storage write failed: {0}")]
    StorageWrite(String),
}

impl ArchiveError {
    /// Wrap a descriptor parse failure with the entry it came from.
    pub fn format(
        entry: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ArchiveError::Format {
            entry: entry.into(),
            source: Box::new(source),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;
