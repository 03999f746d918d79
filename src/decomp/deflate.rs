//! DEFLATE codec, for zlib- or raw-deflate-compressed blocks.

use flate2::{Decompress, FlushDecompress, Status};

use super::{DecompressSession, Decompression, OUT_CHUNK_SIZE, Step};
use crate::error::{ArchiveError, Result};

/// DEFLATE decompression backed by `flate2`'s stateful decoder.
pub struct DeflateDecompression {
    zlib_header: bool,
}

impl DeflateDecompression {
    /// `zlib_header` selects zlib-wrapped vs raw deflate streams.
    pub fn new(zlib_header: bool) -> Self {
        Self { zlib_header }
    }
}

impl Decompression for DeflateDecompression {
    fn begin(&self, input_len: usize) -> Result<Box<dyn DecompressSession>> {
        Ok(Box::new(DeflateSession {
            decoder: Decompress::new(self.zlib_header),
            input: Vec::with_capacity(input_len),
            consumed: 0,
            out: Vec::with_capacity(OUT_CHUNK_SIZE),
        }))
    }
}

struct DeflateSession {
    decoder: Decompress,
    input: Vec<u8>,
    consumed: usize,
    out: Vec<u8>,
}

impl DecompressSession for DeflateSession {
    fn feed(&mut self, input: &[u8]) {
        self.input.clear();
        self.input.extend_from_slice(input);
        self.consumed = 0;
    }

    fn step(&mut self) -> Result<Step> {
        self.out.clear();

        let flush = if self.consumed < self.input.len() {
            FlushDecompress::None
        } else {
            FlushDecompress::Finish
        };

        let before_in = self.decoder.total_in();
        let status = self
            .decoder
            .decompress_vec(&self.input[self.consumed..], &mut self.out, flush)
            .map_err(|e| ArchiveError::Decompression(e.to_string()))?;
        self.consumed += (self.decoder.total_in() - before_in) as usize;

        match status {
            Status::StreamEnd => Ok(Step::Finished),
            // BufError with input exhausted and nothing produced means the
            // stream is truncated; anything else is just a full chunk.
            Status::BufError if self.out.is_empty() && self.consumed >= self.input.len() => {
                Err(ArchiveError::Decompression("truncated deflate stream".into()))
            }
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
