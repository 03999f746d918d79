//! Decompression engine contract and concrete codecs.
//!
//! The payload extractor never talks to a codec directly. It drives a
//! [`DecompressSession`] obtained from a [`Decompression`] capability object
//! that the host application constructs once and passes down. There is no
//! process-wide init flag or other ambient state, which keeps first-call
//! latency out of request paths and test setup deterministic.
//!
//! ## Session protocol
//!
//! 1. [`Decompression::begin`] creates a session sized to one compressed
//!    block.
//! 2. [`DecompressSession::feed`] supplies the entire block as input.
//! 3. Repeated [`DecompressSession::step`] calls each produce zero or more
//!    decompressed bytes, readable via [`DecompressSession::output`], also
//!    after a step that returned an error, since a failing step may still
//!    have produced a usable prefix.
//! 4. [`DecompressSession::clear_output`] tells the session its output has
//!    been drained before the next step.
//! 5. Dropping the session releases it, on every exit path.

mod deflate;
mod xz;

pub use deflate::DeflateDecompression;
pub use xz::XzDecompression;

use crate::error::Result;

/// Per-step output capacity. Bounds how much decompressed data a single
/// step can materialize, no matter how large the cluster inflates to.
pub(crate) const OUT_CHUNK_SIZE: usize = 64 * 1024;

/// Result of one decompression step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The stream may still produce output; keep stepping.
    More,
    /// The stream has ended; no further output will appear.
    Finished,
}

/// One active decompression over a single compressed block.
pub trait DecompressSession: Send {
    /// Supply the whole compressed block as input.
    fn feed(&mut self, input: &[u8]);

    /// Run one decompression step.
    fn step(&mut self) -> Result<Step>;

    /// Bytes produced by the most recent step.
    fn output(&self) -> &[u8];

    /// Signal that [`output`](Self::output) has been consumed.
    fn clear_output(&mut self);
}

/// Initialize-once decompression capability.
pub trait Decompression: Send + Sync {
    /// Create a session for a compressed block of `input_len` bytes.
    fn begin(&self, input_len: usize) -> Result<Box<dyn DecompressSession>>;
}
