//! XZ codec, the clustered format's native compression.

use xz2::stream::{Action, Status, Stream};

use super::{DecompressSession, Decompression, OUT_CHUNK_SIZE, Step};
use crate::error::{ArchiveError, Result};

/// XZ decompression backed by `liblzma`'s streaming decoder.
pub struct XzDecompression {
    memlimit: u64,
}

impl XzDecompression {
    pub fn new() -> Self {
        Self { memlimit: u64::MAX }
    }

    /// Cap the decoder's memory usage per session.
    pub fn with_memlimit(memlimit: u64) -> Self {
        Self { memlimit }
    }
}

impl Default for XzDecompression {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompression for XzDecompression {
    fn begin(&self, input_len: usize) -> Result<Box<dyn DecompressSession>> {
        let stream = Stream::new_stream_decoder(self.memlimit, 0)
            .map_err(|e| ArchiveError::Decompression(e.to_string()))?;
        Ok(Box::new(XzSession {
            stream,
            input: Vec::with_capacity(input_len),
            consumed: 0,
            out: Vec::with_capacity(OUT_CHUNK_SIZE),
        }))
    }
}

struct XzSession {
    stream: Stream,
    input: Vec<u8>,
    consumed: usize,
    out: Vec<u8>,
}

impl DecompressSession for XzSession {
    fn feed(&mut self, input: &[u8]) {
        self.input.clear();
        self.input.extend_from_slice(input);
        self.consumed = 0;
    }

    fn step(&mut self) -> Result<Step> {
        self.out.clear();

        // Run while input remains; Finish once it is exhausted so the
        // decoder flushes its tail and reports stream end.
        let action = if self.consumed < self.input.len() {
            Action::Run
        } else {
            Action::Finish
        };

        let before_in = self.stream.total_in();
        let status = self
            .stream
            .process_vec(&self.input[self.consumed..], &mut self.out, action)
            .map_err(|e| ArchiveError::Decompression(e.to_string()))?;
        self.consumed += (self.stream.total_in() - before_in) as usize;

        match status {
            Status::StreamEnd => Ok(Step::Finished),
            _ => Ok(Step::More),
        }
    }

    fn output(&self) -> &[u8] {
        &self.out
    }

    fn clear_output(&mut self) {
        self.out.clear();
    }
}
