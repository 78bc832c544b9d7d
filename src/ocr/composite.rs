//! Primary/fallback OCR composition.
//!
//! Availability over precision: a blank or failed primary extraction falls
//! through to the fallback backend, and a failed fallback degrades to an
//! empty result. Extraction never surfaces an error to the capture loop.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::RgbaImage;
use log::warn;

use super::OcrEngine;

pub struct CompositeOcrEngine {
    primary: Arc<dyn OcrEngine>,
    fallback: Arc<dyn OcrEngine>,
}

impl CompositeOcrEngine {
    pub fn new(primary: Arc<dyn OcrEngine>, fallback: Arc<dyn OcrEngine>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl OcrEngine for CompositeOcrEngine {
    async fn extract_text(
        &self,
        image: &RgbaImage,
        language_hint: Option<&str>,
    ) -> Result<String> {
        match self.primary.extract_text(image, language_hint).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {}
            Err(err) => warn!("primary OCR failed, trying fallback: {err}"),
        }
        match self.fallback.extract_text(image, language_hint).await {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!("fallback OCR failed: {err}");
                Ok(String::new())
            }
        }
    }
}
