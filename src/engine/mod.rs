//! Streaming local-inference contract and its backends.
//!
//! Generation is token-streamed: fragments are delivered in order through an
//! `on_token` callback as they become available, and the full concatenation
//! is returned once the stream completes. A mid-stream failure is surfaced as
//! an error without retracting the fragments already delivered.

pub mod echo;
pub mod native;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use echo::EchoEngine;
pub use native::{NativeModelEngine, NativeRuntime};

/// Sampling parameters, passed through to the backend uninterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 256,
            top_p: 0.95,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine not ready")]
    NotReady,
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Token sink invoked synchronously for each fragment. Fragment boundaries
/// carry no meaning; callers must not assume they align with words.
pub type TokenSink<'a> = dyn FnMut(&str) + Send + 'a;

/// Polymorphic streaming inference capability.
#[async_trait]
pub trait LocalModelEngine: Send + Sync {
    /// Pure status check, no side effects.
    fn is_ready(&self) -> bool;

    /// Resolve and load the backing model from local storage, reporting
    /// coarse progress (0 and 100 at minimum). Failure is observed only via
    /// `is_ready()` staying false; this never errors.
    async fn ensure_available(&self, on_progress: &(dyn Fn(u8) + Send + Sync));

    /// Stream a completion for `prompt`. Errors with
    /// [`EngineError::NotReady`] before delivering any token when the engine
    /// is not ready. Concurrent calls on one engine are not supported;
    /// callers serialize turns.
    async fn generate_stream(
        &self,
        prompt: &str,
        params: GenParams,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String, EngineError>;
}

/// Orchestrator policy: prefer the real backend when it is ready, otherwise
/// degrade to the fallback so chat stays minimally functional.
pub fn select_engine<'a>(
    preferred: &'a dyn LocalModelEngine,
    fallback: &'a dyn LocalModelEngine,
) -> &'a dyn LocalModelEngine {
    if preferred.is_ready() {
        preferred
    } else {
        fallback
    }
}
