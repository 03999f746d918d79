//! Clustered single-file archive (ZIM-like) support.
//!
//! Two independent pieces: [`ZimIndexBuilder`] streams the archive's text
//! index into storage, and [`ZimPayloadExtractor`] serves individual
//! payloads out of compressed clusters on demand.

mod index;
mod payload;

pub use index::{ZIM_BATCH_SIZE, ZimIndexBuilder};
pub use payload::{PayloadEntry, ZimPayloadExtractor};
