//! Canonical record shapes shared by both archive formats.
//!
//! Every ingestion path (the WACZ page index as well as the ZIM text
//! index) normalizes its raw, format-specific lines into the types here,
//! so the storage sink never needs to know which container a record came
//! from.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mime resolution table: format-specific mime code to mime string.
pub type MimeTable = HashMap<u32, String>;

/// Fallback mime for codes missing from the table.
pub const DEFAULT_MIME: &str = "text/html";

/// Payload location within a container entry or compressed cluster.
///
/// `start`/`length` address the (possibly compressed) byte range. When both
/// `d_off` and `d_len` are present, the payload is a window inside the
/// decompressed form of that range and must go through
/// [`ZimPayloadExtractor`](crate::ZimPayloadExtractor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSource {
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d_off: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d_len: Option<u64>,
}

impl RecordSource {
    /// Whether the payload is a byte window inside a compressed cluster.
    ///
    /// Presence of both fields decides, not their values: a window starting
    /// at decompressed offset zero is still a window.
    pub fn is_range_compressed(&self) -> bool {
        self.d_off.is_some() && self.d_len.is_some()
    }
}

/// One canonical index entry describing a capturable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    /// Capture time, epoch milliseconds.
    pub ts: u64,
    /// 302 when a redirect target is present, else 200.
    pub status: u16,
    /// Content-addressing key; falls back to the record's own URL.
    pub digest: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RecordSource>,
    pub loaded: bool,
}

/// Raw clustered-format text-index line, as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct CdxLine {
    #[serde(default)]
    pub mime: u32,
    pub redirect: Option<String>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub length: u64,
    pub d_off: Option<u64>,
    pub d_len: Option<u64>,
    /// Bare-object lines carry the URL inline instead of as a path prefix.
    pub url: Option<String>,
}

impl Record {
    /// Normalize a raw index line into a canonical record.
    ///
    /// `url` is the already-prefixed resource URL. A `redirect` field turns
    /// the record into a 302 with the prefixed target and no source range;
    /// otherwise the record is a 200 addressed by the line's byte range.
    pub fn from_cdx(cdx: CdxLine, url: String, prefix: &str, mime_types: &MimeTable) -> Record {
        let mime = mime_types
            .get(&cdx.mime)
            .cloned()
            .unwrap_or_else(|| DEFAULT_MIME.to_string());

        let (status, redirect, source) = match cdx.redirect {
            Some(target) => (302, Some(format!("{prefix}{target}")), None),
            None => {
                let source = RecordSource {
                    start: cdx.offset,
                    length: cdx.length,
                    d_off: cdx.d_off,
                    d_len: cdx.d_len,
                };
                (200, None, Some(source))
            }
        };

        // No true content hash is available in the text index.
        let digest = url.clone();

        Record {
            url,
            ts: now_millis(),
            status,
            digest,
            mime,
            redirect,
            source,
            loaded: false,
        }
    }
}

/// One line of a WACZ page-index stream (everything after the header).
///
/// Page lines are an open schema; unknown fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Originating container, stamped during ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacz: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Header/summary record: the first line of a page-index stream.
///
/// Describes the index rather than a page and is never forwarded to
/// storage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageListInfo {
    #[serde(default, rename = "hasText")]
    pub has_text: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Container-level metadata extracted from a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, rename = "textIndex", skip_serializing_if = "Option::is_none")]
    pub text_index: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mime_table() -> MimeTable {
        HashMap::from([(0, "text/html".to_string()), (1, "text/plain".to_string())])
    }

    #[test]
    fn normalizes_range_line() {
        let cdx: CdxLine = serde_json::from_str(r#"{"mime":0,"offset":10,"length":20}"#).unwrap();
        let record = Record::from_cdx(cdx, "/site/pages/a.html".to_string(), "/site/", &mime_table());

        assert_eq!(record.url, "/site/pages/a.html");
        assert_eq!(record.status, 200);
        assert_eq!(record.mime, "text/html");
        assert_eq!(record.redirect, None);
        assert_eq!(record.digest, "/site/pages/a.html");
        assert!(!record.loaded);

        let source = record.source.unwrap();
        assert_eq!(source.start, 10);
        assert_eq!(source.length, 20);
        assert!(!source.is_range_compressed());
    }

    #[test]
    fn redirect_line_carries_no_source() {
        let cdx: CdxLine =
            serde_json::from_str(r#"{"mime":1,"redirect":"other.html","d_off":5,"d_len":9}"#)
                .unwrap();
        let record = Record::from_cdx(cdx, "/z/a.html".to_string(), "/z/", &mime_table());

        assert_eq!(record.status, 302);
        assert_eq!(record.redirect.as_deref(), Some("/z/other.html"));
        assert!(record.source.is_none());
    }

    #[test]
    fn unknown_mime_code_falls_back_to_html() {
        let cdx: CdxLine = serde_json::from_str(r#"{"mime":99,"offset":0,"length":1}"#).unwrap();
        let record = Record::from_cdx(cdx, "/a".to_string(), "/", &mime_table());
        assert_eq!(record.mime, "text/html");

        let cdx: CdxLine = serde_json::from_str(r#"{"mime":1,"offset":0,"length":1}"#).unwrap();
        let record = Record::from_cdx(cdx, "/a".to_string(), "/", &mime_table());
        assert_eq!(record.mime, "text/plain");
    }

    #[test]
    fn zero_decompressed_offset_still_counts_as_window() {
        let source = RecordSource {
            start: 0,
            length: 4,
            d_off: Some(0),
            d_len: Some(2),
        };
        assert!(source.is_range_compressed());
    }

    #[test]
    fn page_record_keeps_unknown_fields() {
        let page: PageRecord =
            serde_json::from_str(r#"{"url":"https://a.test/","ts":"2023-01-01","size":12}"#)
                .unwrap();
        assert_eq!(page.url, "https://a.test/");
        assert_eq!(page.extra.get("size"), Some(&Value::from(12)));
    }
}
