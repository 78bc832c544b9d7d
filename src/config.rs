//! Pipeline configuration, persisted as JSON next to the asset root.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureConfig;
use crate::engine::GenParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capture_interval_ms: u64,
    pub tick_timeout_secs: u64,
    pub frame_change_threshold: u32,
    pub language_hint: Option<String>,
    pub max_text_chars: usize,
    pub render_cap_chars: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_interval_ms: 1500,
            tick_timeout_secs: 10,
            frame_change_threshold: 8,
            language_hint: None,
            max_text_chars: crate::context::MAX_TEXT_CHARS,
            render_cap_chars: crate::context::DEFAULT_RENDER_CAP,
            temperature: 0.7,
            max_tokens: 256,
            top_p: 0.95,
        }
    }
}

impl PipelineConfig {
    /// Load from `path`; a missing file or unparsable contents yield the
    /// defaults rather than an error.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write config to {}", path.display()))
    }

    pub fn capture(&self) -> CaptureConfig {
        CaptureConfig {
            interval: Duration::from_millis(self.capture_interval_ms),
            tick_timeout: Duration::from_secs(self.tick_timeout_secs),
            frame_change_threshold: self.frame_change_threshold,
            language_hint: self.language_hint.clone(),
        }
    }

    pub fn gen_params(&self) -> GenParams {
        GenParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }
}
