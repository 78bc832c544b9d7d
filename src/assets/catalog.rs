//! Static asset catalog: the list of downloadable model and language-data
//! files, loaded from a JSON list supplied by the host.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What an asset is used for; determines its on-disk category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    LlmModel,
    SttModel,
    TessData,
}

impl AssetKind {
    pub fn category(&self) -> &'static str {
        match self {
            AssetKind::LlmModel => "models",
            AssetKind::SttModel => "stt",
            AssetKind::TessData => "tessdata",
        }
    }
}

/// One downloadable asset: identity, source, and integrity expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub id: String,
    pub display_name: String,
    pub source_url: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    /// Target filename: the last path segment of the source URL, falling back
    /// to the asset id.
    pub fn file_name(&self) -> String {
        self.source_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(&self.id)
            .replace(['\\', '/'], "_")
    }
}

/// Parse a JSON list of descriptors from `path`.
pub fn load_catalog(path: &Path) -> Result<Vec<AssetDescriptor>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read asset catalog {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse asset catalog {}", path.display()))
}
