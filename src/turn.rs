//! Chat-turn orchestration: one question in, one streamed answer out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use log::error;

use crate::context::ScreenContextAggregator;
use crate::engine::{select_engine, GenParams, LocalModelEngine, TokenSink};
use crate::prompt;

/// Ephemeral per-turn state, owned exclusively by the turn handler and
/// dropped when the turn completes. Never reused across turns.
#[derive(Debug, Clone)]
pub struct InferenceSession {
    pub prompt: String,
    pub params: GenParams,
    pub accumulated: String,
}

/// Runs user turns against the preferred engine, falling back to the
/// stand-in when the real model is not ready.
///
/// Turns are single-flight: the engines do not support concurrent
/// generation, so a second turn started while one is running fails fast.
pub struct TurnHandler {
    preferred: Arc<dyn LocalModelEngine>,
    fallback: Arc<dyn LocalModelEngine>,
    aggregator: Arc<ScreenContextAggregator>,
    params: GenParams,
    in_flight: AtomicBool,
}

struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TurnHandler {
    pub fn new(
        preferred: Arc<dyn LocalModelEngine>,
        fallback: Arc<dyn LocalModelEngine>,
        aggregator: Arc<ScreenContextAggregator>,
        params: GenParams,
    ) -> Self {
        Self {
            preferred,
            fallback,
            aggregator,
            params,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Answer `question` about the current screen, streaming fragments into
    /// `on_token`. A backend failure mid-stream is appended inline to the
    /// answer instead of terminating the conversation; delivered fragments
    /// stand.
    pub async fn run_turn(
        &self,
        question: &str,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            bail!("empty question");
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            bail!("a turn is already in progress");
        }
        let _guard = FlightGuard(&self.in_flight);

        let context = self.aggregator.render();
        let mut session = InferenceSession {
            prompt: prompt::build(question, &context),
            params: self.params,
            accumulated: String::new(),
        };

        let engine = select_engine(self.preferred.as_ref(), self.fallback.as_ref());
        let prompt = &session.prompt;
        let accumulated = &mut session.accumulated;
        let result = {
            let mut sink = |token: &str| {
                accumulated.push_str(token);
                on_token(token);
            };
            engine.generate_stream(prompt, session.params, &mut sink).await
        };

        match result {
            Ok(full) => Ok(full),
            Err(err) => {
                error!("generation failed: {err}");
                let notice = format!("Failed: {err}");
                on_token(&notice);
                session.accumulated.push_str(&notice);
                Ok(session.accumulated)
            }
        }
    }
}
