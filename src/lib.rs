//! screentalk-core: the on-device screen-context pipeline behind the
//! ScreenTalk assistant.
//!
//! The pipeline continuously captures screen frames, extracts text through
//! competing OCR backends, merges the result with accessibility-tree
//! introspection into a single versioned [`context::ScreenContext`] snapshot,
//! and feeds that snapshot plus the user's question into a streaming local
//! inference engine. Model and OCR language assets are provisioned through a
//! checksum-gated download manager.
//!
//! Platform concerns (screen-recording consent, the accessibility event
//! framework, native OCR recognizers, the native model runtime) are expressed
//! as traits at the crate boundary; hosts supply the bindings.

pub mod accessibility;
pub mod assets;
pub mod capture;
pub mod config;
pub mod context;
pub mod engine;
pub mod ocr;
pub mod prompt;
pub mod turn;
mod utils;

pub use config::PipelineConfig;
pub use context::{ScreenContext, ScreenContextAggregator};

/// Initialize logging from the `RUST_LOG` environment variable,
/// defaulting to `info`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
