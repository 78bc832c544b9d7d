//! Text extraction from captured frames.
//!
//! [`OcrEngine`] is the capability the capture loop consumes. Two backends
//! implement it with orthogonal tradeoffs — a fast per-call neural recognizer
//! dispatched by script family, and a heavier legacy engine bound to a
//! trained-language data file — and [`composite::CompositeOcrEngine`] layers
//! them into a primary/fallback policy that degrades to "no text detected"
//! instead of ever failing its caller.

pub mod composite;
pub mod fast;
pub mod legacy;

use anyhow::Result;
use async_trait::async_trait;
use image::RgbaImage;

pub use composite::CompositeOcrEngine;
pub use fast::FastOcrEngine;
pub use legacy::LegacyOcrEngine;

/// Script family a recognizer is trained for. Language hints resolve to one
/// of these; unknown hints fall back to [`ScriptFamily::Latin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptFamily {
    Latin,
    Arabic,
    Cyrillic,
    Devanagari,
    Cjk,
}

impl ScriptFamily {
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "en" | "eng" | "lat" | "latin" | "fr" | "de" | "es" | "pt" | "it" => {
                Some(ScriptFamily::Latin)
            }
            "ar" | "ara" | "arabic" | "fa" | "ur" => Some(ScriptFamily::Arabic),
            "ru" | "rus" | "uk" | "cyrillic" => Some(ScriptFamily::Cyrillic),
            "hi" | "hin" | "mr" | "devanagari" => Some(ScriptFamily::Devanagari),
            "zh" | "ja" | "jpn" | "ko" | "kor" | "cjk" => Some(ScriptFamily::Cjk),
            _ => None,
        }
    }
}

/// Polymorphic text-extraction capability.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract visible text from `image`. `language_hint` is an optional
    /// BCP-47-ish code ("en", "ara", ...) backends may use for recognizer
    /// selection. Dropping the returned future cancels the extraction.
    async fn extract_text(&self, image: &RgbaImage, language_hint: Option<&str>)
        -> Result<String>;
}

/// Boundary to a platform or native text recognizer (ML Kit, Tesseract,
/// a vision framework). The OCR backends own policy; recognizers own pixels.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &RgbaImage) -> Result<String>;
}
