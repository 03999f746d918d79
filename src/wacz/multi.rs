//! Multi-container manifest loader.
//!
//! A much simpler shape than a full container: a JSON document naming a
//! set of member containers by path. Paths resolve against the manifest's
//! own URL and the resolved list is handed to storage's sync hook.

use serde::Deserialize;

use crate::error::{ArchiveError, Result};
use crate::records::Metadata;
use crate::storage::Storage;

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestResource {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiWaczManifest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

pub struct MultiWaczLoader {
    manifest: MultiWaczManifest,
    base_url: String,
}

impl MultiWaczLoader {
    pub fn new(manifest: MultiWaczManifest, base_url: impl Into<String>) -> Self {
        Self {
            manifest,
            base_url: base_url.into(),
        }
    }

    pub fn from_json(text: &str, base_url: impl Into<String>) -> Result<Self> {
        let manifest =
            serde_json::from_str(text).map_err(|e| ArchiveError::format("manifest", e))?;
        Ok(Self::new(manifest, base_url))
    }

    /// Hand the resolved member URL list to storage and return metadata.
    pub async fn load(&self, db: &dyn Storage) -> Result<Metadata> {
        let urls = self
            .manifest
            .resources
            .iter()
            .map(|res| resolve_url(&self.base_url, &res.path))
            .collect();

        db.sync_wacz(urls).await?;

        Ok(Metadata {
            title: self.manifest.title.clone(),
            desc: self.manifest.description.clone(),
            ..Default::default()
        })
    }
}

/// Resolve a manifest path against the manifest's base URL.
fn resolve_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    // Root-relative: keep only the scheme and authority of the base.
    if let Some(rest) = path.strip_prefix('/') {
        if let Some(scheme_end) = base.find("://") {
            let authority_start = scheme_end + 3;
            let authority_end = base[authority_start..]
                .find('/')
                .map_or(base.len(), |i| authority_start + i);
            return format!("{}/{}", &base[..authority_end], rest);
        }
        return path.to_string();
    }

    // Relative: replace the last segment of the base path.
    match base.rfind('/') {
        Some(i) if base.find("://").is_none_or(|s| i > s + 2) => {
            format!("{}/{}", &base[..i], path)
        }
        _ => format!("{base}/{path}"),
    }
}
