//! Streaming ingestion of the clustered format's text index.
//!
//! The text index is newline-delimited: each line is either a bare JSON
//! object or a URL path followed by `" {"` and a JSON object. Lines are
//! normalized into canonical records and written to storage in batches.
//! Unlike the page-index path, this one tolerates corrupt lines: text
//! indexes are heterogeneous and a bad line must not invalidate the build.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::lines::LineReader;
use crate::records::{CdxLine, MimeTable, Record};
use crate::storage::Storage;

/// Records per bulk insert.
pub const ZIM_BATCH_SIZE: usize = 1000;

/// Batch writes in flight at once. Submissions beyond this wait for the
/// oldest write to land, bounding memory use under a fast producer and a
/// slow sink.
const MAX_INFLIGHT_WRITES: usize = 4;

/// Builds the record index from a clustered archive's text index.
pub struct ZimIndexBuilder {
    prefix: String,
    mime_types: MimeTable,
    count: u64,
}

impl ZimIndexBuilder {
    pub fn new(prefix: impl Into<String>, mime_types: MimeTable) -> Self {
        Self {
            prefix: prefix.into(),
            mime_types,
            count: 0,
        }
    }

    /// Stream the text index into storage; returns the record count.
    ///
    /// Batch writes are launched without awaiting each one; their handles
    /// are joined once at end of stream. A write that fails late is logged
    /// as data loss rather than re-raised, since earlier batches have
    /// already committed.
    pub async fn load<R: AsyncRead + Unpin>(
        &mut self,
        db: Arc<dyn Storage>,
        lines: &mut LineReader<R>,
    ) -> Result<u64> {
        let mut batch: Vec<Record> = Vec::with_capacity(ZIM_BATCH_SIZE);
        let mut pending: VecDeque<JoinHandle<Result<()>>> = VecDeque::new();

        while let Some(orig_line) = lines.next_line().await? {
            let line = orig_line.trim_end();
            if line.is_empty() {
                continue;
            }

            let (url_path, json) = if line.starts_with('{') {
                (None, line)
            } else {
                match line.find(" {") {
                    Some(inx) => (Some(line[..inx].trim()), &line[inx + 1..]),
                    None => continue,
                }
            };

            let cdx: CdxLine = match serde_json::from_str(json) {
                Ok(cdx) => cdx,
                Err(error) => {
                    warn!(%error, line, "skipping unparseable index line");
                    continue;
                }
            };

            let url = match (url_path, &cdx.url) {
                (Some(path), _) => format!("{}{}", self.prefix, path),
                (None, Some(url)) => format!("{}{}", self.prefix, url),
                (None, None) => {
                    warn!(line, "skipping index line without a url");
                    continue;
                }
            };

            batch.push(Record::from_cdx(cdx, url, &self.prefix, &self.mime_types));

            if batch.len() >= ZIM_BATCH_SIZE {
                self.count += batch.len() as u64;
                debug!(count = self.count, "read records");
                let full = mem::replace(&mut batch, Vec::with_capacity(ZIM_BATCH_SIZE));
                submit(&db, &mut pending, full).await;
            }
        }

        if !batch.is_empty() {
            self.count += batch.len() as u64;
            submit(&db, &mut pending, batch).await;
        }

        debug!(count = self.count, "indexed records");

        while let Some(handle) = pending.pop_front() {
            join_write(handle).await;
        }

        Ok(self.count)
    }
}

/// Launch one batch write, first making room in the in-flight window.
async fn submit(
    db: &Arc<dyn Storage>,
    pending: &mut VecDeque<JoinHandle<Result<()>>>,
    batch: Vec<Record>,
) {
    if pending.len() >= MAX_INFLIGHT_WRITES {
        if let Some(oldest) = pending.pop_front() {
            join_write(oldest).await;
        }
    }
    let db = Arc::clone(db);
    pending.push_back(tokio::spawn(async move { db.add_resources(batch).await }));
}

async fn join_write(handle: JoinHandle<Result<()>>) {
    match handle.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => warn!(%error, "batch write failed; its records were lost"),
        Err(error) => warn!(%error, "batch write task aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorage;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn mime_table() -> MimeTable {
        HashMap::from([(0, "text/html".to_string())])
    }

    fn builder() -> ZimIndexBuilder {
        ZimIndexBuilder::new("/site/", mime_table())
    }

    #[tokio::test]
    async fn normalizes_prefixed_and_bare_lines() {
        let index = "pages/a.html {\"mime\":0,\"offset\":10,\"length\":20}\n\
                     {\"url\":\"inline.html\",\"mime\":0,\"offset\":1,\"length\":2}\n\
                     \n\
                     not an index line\n\
                     broken {\"mime\":]\n\
                     {\"mime\":0,\"offset\":3,\"length\":4}\n\
                     pages/r.html {\"mime\":0,\"redirect\":\"pages/a.html\"}\n";

        let db = Arc::new(MemStorage::new());
        let mut lines = LineReader::new(index.as_bytes());
        let count = builder()
            .load(db.clone() as Arc<dyn Storage>, &mut lines)
            .await
            .unwrap();

        // Blank, delimiter-less, corrupt-JSON and url-less lines are dropped.
        assert_eq!(count, 3);
        let records = db.all_resources().await;

        assert_eq!(records[0].url, "/site/pages/a.html");
        assert_eq!(records[0].status, 200);
        assert_eq!(records[0].mime, "text/html");
        let source = records[0].source.clone().unwrap();
        assert_eq!((source.start, source.length), (10, 20));

        assert_eq!(records[1].url, "/site/inline.html");

        assert_eq!(records[2].status, 302);
        assert_eq!(records[2].redirect.as_deref(), Some("/site/pages/a.html"));
        assert!(records[2].source.is_none());
    }

    #[tokio::test]
    async fn batches_at_fixed_size() {
        let mut index = String::new();
        for i in 0..(ZIM_BATCH_SIZE + 1) {
            index.push_str(&format!(
                "p/{i}.html {{\"mime\":0,\"offset\":{i},\"length\":1}}\n"
            ));
        }

        let db = Arc::new(MemStorage::new());
        let mut lines = LineReader::new(index.as_bytes());
        let count = builder()
            .load(db.clone() as Arc<dyn Storage>, &mut lines)
            .await
            .unwrap();

        assert_eq!(count, (ZIM_BATCH_SIZE + 1) as u64);
        let mut sizes: Vec<usize> = db.resource_batches().await.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, ZIM_BATCH_SIZE]);

        let mut urls: Vec<String> = db.all_resources().await.into_iter().map(|r| r.url).collect();
        urls.sort_unstable();
        assert_eq!(urls.len(), ZIM_BATCH_SIZE + 1);
        assert!(urls.contains(&format!("/site/p/{}.html", ZIM_BATCH_SIZE)));
    }

    /// Sink that fails every write; the build must still complete.
    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn add_pages(&self, _pages: Vec<crate::records::PageRecord>) -> Result<()> {
            Ok(())
        }
        async fn add_resources(&self, _resources: Vec<Record>) -> Result<()> {
            Err(crate::ArchiveError::StorageWrite("disk full".into()))
        }
        async fn init_config(&self, _config: Value) -> Result<()> {
            Ok(())
        }
        async fn load_pages_csv(&self, _entry_name: &str) -> Result<()> {
            Ok(())
        }
        async fn add_curated_page_lists(
            &self,
            _lists: Vec<Value>,
            _page_key: &str,
            _show_key: &str,
        ) -> Result<()> {
            Ok(())
        }
        async fn add_wacz_file(
            &self,
            _name: &str,
            _entries: Vec<crate::reader::ContainerEntry>,
        ) -> Result<()> {
            Ok(())
        }
        async fn sync_wacz(&self, _urls: Vec<String>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn late_write_failures_are_logged_not_raised() {
        let index = "p/a.html {\"mime\":0,\"offset\":0,\"length\":1}\n";
        let mut lines = LineReader::new(index.as_bytes());
        let count = builder()
            .load(Arc::new(FailingStorage), &mut lines)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    /// Sink that tracks how many writes run concurrently.
    struct ConcurrencyProbe {
        current: AtomicUsize,
        max_seen: AtomicUsize,
        total: AtomicUsize,
    }

    #[async_trait]
    impl Storage for ConcurrencyProbe {
        async fn add_pages(&self, _pages: Vec<crate::records::PageRecord>) -> Result<()> {
            Ok(())
        }
        async fn add_resources(&self, resources: Vec<Record>) -> Result<()> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.total.fetch_add(resources.len(), Ordering::SeqCst);
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
        async fn init_config(&self, _config: Value) -> Result<()> {
            Ok(())
        }
        async fn load_pages_csv(&self, _entry_name: &str) -> Result<()> {
            Ok(())
        }
        async fn add_curated_page_lists(
            &self,
            _lists: Vec<Value>,
            _page_key: &str,
            _show_key: &str,
        ) -> Result<()> {
            Ok(())
        }
        async fn add_wacz_file(
            &self,
            _name: &str,
            _entries: Vec<crate::reader::ContainerEntry>,
        ) -> Result<()> {
            Ok(())
        }
        async fn sync_wacz(&self, _urls: Vec<String>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_flight_writes_are_capped() {
        let mut index = String::new();
        for i in 0..(ZIM_BATCH_SIZE * 8) {
            index.push_str(&format!(
                "p/{i}.html {{\"mime\":0,\"offset\":{i},\"length\":1}}\n"
            ));
        }

        let probe = Arc::new(ConcurrencyProbe {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        });
        let mut lines = LineReader::new(index.as_bytes());
        builder()
            .load(probe.clone() as Arc<dyn Storage>, &mut lines)
            .await
            .unwrap();

        assert_eq!(probe.total.load(Ordering::SeqCst), ZIM_BATCH_SIZE * 8);
        assert!(probe.max_seen.load(Ordering::SeqCst) <= MAX_INFLIGHT_WRITES);
    }
}
