//! Streaming ingestion of newline-delimited page-index records.

use tokio::io::AsyncRead;

use crate::error::{ArchiveError, Result};
use crate::lines::LineReader;
use crate::records::{PageListInfo, PageRecord};
use crate::storage::Storage;

/// Pages per bulk insert.
pub const PAGE_BATCH_SIZE: usize = 500;

/// Ingest a page-index stream into storage.
///
/// The first line is the header/summary record and is returned rather than
/// stored; every later line is one page record, stamped with `wacz` when a
/// container tag is supplied. Batches of [`PAGE_BATCH_SIZE`] are flushed
/// with strict backpressure: each `add_pages` call completes before the
/// next line is read. Page lines are a closed schema, so a line that fails
/// to parse is fatal for the whole call.
pub async fn load_pages<R: AsyncRead + Unpin>(
    db: &dyn Storage,
    lines: &mut LineReader<R>,
    wacz: Option<&str>,
) -> Result<PageListInfo> {
    let mut info: Option<PageListInfo> = None;
    let mut pages: Vec<PageRecord> = Vec::with_capacity(PAGE_BATCH_SIZE);

    while let Some(line) = lines.next_line().await? {
        if info.is_none() {
            info = Some(parse_line(&line)?);
            continue;
        }

        let mut page: PageRecord = parse_line(&line)?;
        if let Some(wacz) = wacz {
            page.wacz = Some(wacz.to_string());
        }
        pages.push(page);

        if pages.len() == PAGE_BATCH_SIZE {
            db.add_pages(std::mem::take(&mut pages)).await?;
        }
    }

    if !pages.is_empty() {
        db.add_pages(pages).await?;
    }

    Ok(info.unwrap_or_default())
}

fn parse_line<T: serde::de::DeserializeOwned>(line: &str) -> Result<T> {
    serde_json::from_str(line).map_err(|source| ArchiveError::LineParse {
        line: line.to_string(),
        source,
    })
}
