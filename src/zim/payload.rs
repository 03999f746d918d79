//! On-demand payload retrieval from compressed clusters.
//!
//! A clustered archive stores many records' payloads concatenated and
//! compressed together. Serving one record means pulling an exact byte
//! window out of a cluster's decompressed form, without materializing the
//! whole decompressed cluster, which can be far larger than any single
//! payload.
//!
//! ## Extraction strategy
//!
//! The extractor feeds the whole compressed cluster to a decompression
//! session (clusters fit in memory; whole archives do not), then steps the
//! session repeatedly. Each step yields a chunk at some cumulative stream
//! position; chunks overlapping the requested window are copied into the
//! output buffer, and the loop exits as soon as the window is satisfied;
//! the tail of the cluster is never decompressed. The result is byte-exact
//! regardless of how the engine chunks its output across steps.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::decomp::{Decompression, Step};
use crate::error::Result;
use crate::records::Record;

/// One served payload with its response headers.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadEntry {
    pub url: String,
    pub ts: u64,
    pub status: u16,
    pub mime: String,
    pub digest: String,
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
}

/// Extracts a record's payload bytes from its cluster.
pub struct ZimPayloadExtractor {
    decomp: Arc<dyn Decompression>,
}

impl ZimPayloadExtractor {
    pub fn new(decomp: Arc<dyn Decompression>) -> Self {
        Self { decomp }
    }

    /// Serve one record from its (possibly compressed) cluster.
    ///
    /// Redirect records short-circuit to an empty body with a `Location`
    /// header. Records without an inner decompressed range pass the cluster
    /// through untouched. Range-compressed records go through the windowed
    /// decompression loop.
    pub fn extract(&self, record: &Record, cluster: &[u8]) -> Result<PayloadEntry> {
        let mut headers = HashMap::new();

        let payload = if let Some(redirect) = &record.redirect {
            headers.insert("Location".to_string(), redirect.clone());
            Vec::new()
        } else {
            match record.source.as_ref().and_then(|s| s.d_off.zip(s.d_len)) {
                Some((d_off, d_len)) => self.read_window(cluster, d_off, d_len as usize)?,
                None => cluster.to_vec(),
            }
        };

        headers.insert("Content-Type".to_string(), record.mime.clone());

        Ok(PayloadEntry {
            url: record.url.clone(),
            ts: record.ts,
            status: record.status,
            mime: record.mime.clone(),
            digest: record.digest.clone(),
            headers,
            payload,
        })
    }

    /// Decompress exactly `[offset, offset + length)` out of `cluster`.
    ///
    /// A stream that ends or errors before the window is satisfied returns
    /// the bytes copied so far; the session is released on every path.
    fn read_window(&self, cluster: &[u8], offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; length];
        let mut out_written = 0usize;
        // Cumulative decompressed bytes produced, across all steps.
        let mut stream_pos = 0u64;

        let mut session = self.decomp.begin(cluster.len())?;
        session.feed(cluster);

        loop {
            let finished = match session.step() {
                Ok(Step::More) => false,
                Ok(Step::Finished) => true,
                Err(e) => {
                    // A failing step may still have produced a usable
                    // prefix; treat it as end-of-stream.
                    warn!(error = %e, "decompression failed mid-stream");
                    true
                }
            };

            let chunk = session.output();
            let produced = chunk.len() as u64;

            if produced > 0 && stream_pos + produced > offset && out_written < length {
                let skip = offset.saturating_sub(stream_pos) as usize;
                let copy_len = (chunk.len() - skip).min(length - out_written);
                out[out_written..out_written + copy_len]
                    .copy_from_slice(&chunk[skip..skip + copy_len]);
                out_written += copy_len;
            }

            stream_pos += produced;

            if produced > 0 {
                session.clear_output();
            }

            // Stop at stream end, or as soon as the window is satisfied.
            if finished || stream_pos >= offset.saturating_add(length as u64) {
                break;
            }
        }

        if out_written < length {
            warn!(
                expected = length,
                copied = out_written,
                "stream ended before the requested window was satisfied"
            );
            out.truncate(out_written);
        }

        Ok(out)
    }
}
