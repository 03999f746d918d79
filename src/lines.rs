//! Line-oriented adaptation of arbitrary byte sources.
//!
//! Both index formats are newline-delimited text. Rather than probing each
//! reader for line-iteration support, every byte source is adapted once at
//! the boundary into a [`LineReader`], which yields one line at a time
//! without buffering the whole stream.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::error::Result;

/// Lazy line iterator over any async byte source.
pub struct LineReader<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Next line without its terminator, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_lines_then_none() {
        let mut lines = LineReader::new(&b"one\ntwo\r\nthree"[..]);
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("three"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
