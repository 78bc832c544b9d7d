//! Fast neural OCR backend.
//!
//! Stateless per call: each extraction dispatches to the script-family
//! recognizer selected by the language hint, defaulting to the Latin
//! recognizer when the hint is absent or unrecognized.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use image::RgbaImage;

use super::{OcrEngine, ScriptFamily, TextRecognizer};

pub struct FastOcrEngine {
    recognizers: HashMap<ScriptFamily, Arc<dyn TextRecognizer>>,
}

impl FastOcrEngine {
    pub fn new() -> Self {
        Self {
            recognizers: HashMap::new(),
        }
    }

    pub fn with_recognizer(
        mut self,
        family: ScriptFamily,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        self.recognizers.insert(family, recognizer);
        self
    }

    fn select(&self, language_hint: Option<&str>) -> Result<&Arc<dyn TextRecognizer>> {
        let family = language_hint
            .and_then(ScriptFamily::from_hint)
            .unwrap_or(ScriptFamily::Latin);
        if let Some(recognizer) = self.recognizers.get(&family) {
            return Ok(recognizer);
        }
        // Unprovisioned family: fall back to the default script recognizer.
        if let Some(recognizer) = self.recognizers.get(&ScriptFamily::Latin) {
            return Ok(recognizer);
        }
        bail!("no recognizer registered for {family:?} and no Latin default");
    }
}

impl Default for FastOcrEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for FastOcrEngine {
    async fn extract_text(
        &self,
        image: &RgbaImage,
        language_hint: Option<&str>,
    ) -> Result<String> {
        let recognizer = self.select(language_hint)?;
        recognizer.recognize(image).await
    }
}
