//! Legacy OCR backend bound to a trained-language data file.
//!
//! Lazily checks for `<root>/tessdata/<lang>.traineddata` on first use. If
//! the file is not on disk, extraction logs and returns an empty string —
//! provisioning the data is the download manager's job, not this engine's.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use image::RgbaImage;
use log::warn;

use super::{OcrEngine, TextRecognizer};
use crate::assets::AssetStore;

pub struct LegacyOcrEngine {
    store: Arc<AssetStore>,
    language: String,
    recognizer: Arc<dyn TextRecognizer>,
    initialised: AtomicBool,
}

impl LegacyOcrEngine {
    pub fn new(
        store: Arc<AssetStore>,
        language: impl Into<String>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        Self {
            store,
            language: language.into(),
            recognizer,
            initialised: AtomicBool::new(false),
        }
    }

    fn ensure_init(&self) -> Result<()> {
        if self.initialised.load(Ordering::Acquire) {
            return Ok(());
        }
        let data = self.store.tessdata_path(&self.language);
        if !data.exists() {
            bail!("missing traineddata: {}", data.display());
        }
        self.initialised.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl OcrEngine for LegacyOcrEngine {
    async fn extract_text(
        &self,
        image: &RgbaImage,
        _language_hint: Option<&str>,
    ) -> Result<String> {
        if let Err(err) = self.ensure_init() {
            warn!("legacy OCR unavailable: {err}");
            return Ok(String::new());
        }
        self.recognizer.recognize(image).await
    }
}
