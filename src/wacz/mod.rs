//! ZIP-based container (WACZ) support.
//!
//! [`WaczLoader`] orchestrates a single container: descriptor detection
//! (current JSON schema vs legacy YAML schema), page-index ingestion, and
//! either eager full-capture ingestion or lazy on-demand registration.
//! [`MultiWaczLoader`] handles the simpler multi-container manifest.

mod loader;
mod multi;
mod pages;

pub use loader::{ProgressFn, WaczConfig, WaczLoader};
pub use multi::{ManifestResource, MultiWaczLoader, MultiWaczManifest};
pub use pages::{PAGE_BATCH_SIZE, load_pages};

/// Current-schema package descriptor.
pub const DATAPACKAGE_JSON: &str = "datapackage.json";
/// Legacy-schema YAML descriptor.
pub const WEBARCHIVE_YAML: &str = "webarchive.yaml";
/// Canonical page index.
pub const MAIN_PAGES_JSONL: &str = "pages/pages.jsonl";
/// Optional extra/full-text page index; overrides the canonical one.
pub const EXTRA_PAGES_JSONL: &str = "pages/extraPages.jsonl";
/// Legacy CSV page list.
pub const PAGES_CSV: &str = "pages.csv";

/// Largest fully-buffered origin worth retaining for later direct reuse.
pub const MAX_FULL_DOWNLOAD_SIZE: u64 = 25_000_000;
