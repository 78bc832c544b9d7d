//! Trivial stand-in backend: always ready, deterministically echoes the
//! prompt in paced chunks so the chat surface works with no model installed.

use std::time::Duration;

use async_trait::async_trait;

use super::{EngineError, GenParams, LocalModelEngine, TokenSink};

pub struct EchoEngine {
    pacing: Duration,
}

impl EchoEngine {
    pub fn new() -> Self {
        Self {
            pacing: Duration::from_millis(40),
        }
    }

    /// No artificial pacing; for tests.
    pub fn immediate() -> Self {
        Self {
            pacing: Duration::ZERO,
        }
    }
}

impl Default for EchoEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalModelEngine for EchoEngine {
    fn is_ready(&self) -> bool {
        true
    }

    async fn ensure_available(&self, on_progress: &(dyn Fn(u8) + Send + Sync)) {
        on_progress(100);
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        _params: GenParams,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String, EngineError> {
        let reply = format!("Echo: {}", prompt.trim());
        let mut accumulated = String::new();
        for word in reply.split_whitespace() {
            let fragment = format!("{word} ");
            accumulated.push_str(&fragment);
            on_token(&fragment);
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }
        Ok(accumulated.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_prompt_in_fragments() {
        let engine = EchoEngine::immediate();
        let mut fragments = Vec::new();
        let full = engine
            .generate_stream(
                "what is on screen",
                GenParams::default(),
                &mut |token: &str| fragments.push(token.to_string()),
            )
            .await
            .unwrap();

        assert_eq!(full, "Echo: what is on screen");
        assert!(fragments.len() > 1);
        assert_eq!(fragments.concat().trim_end(), full);
    }

    #[tokio::test]
    async fn reports_full_progress_immediately() {
        let engine = EchoEngine::new();
        let progress = std::sync::Mutex::new(Vec::new());
        engine
            .ensure_available(&|percent| progress.lock().unwrap().push(percent))
            .await;
        assert_eq!(*progress.lock().unwrap(), vec![100]);
        assert!(engine.is_ready());
    }
}
