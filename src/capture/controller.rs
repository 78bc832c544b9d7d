//! Capture lifecycle: start, stop, and the observable is-capturing flag.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::context::ScreenContextAggregator;
use crate::ocr::OcrEngine;

use super::loop_worker::capture_loop;
use super::source::{CaptureGrant, ScreenRecorder};
use super::CaptureConfig;

/// Owns the single privileged capture session for the process.
///
/// `start` consumes a one-time grant and spawns the loop; `stop` is
/// idempotent, cancels any in-flight tick, and joins the loop task. Starting
/// while already capturing is an error — the capture handle is exclusively
/// owned, never shared or re-acquired implicitly.
pub struct CaptureController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    capturing_tx: watch::Sender<bool>,
}

impl CaptureController {
    pub fn new() -> Self {
        let (capturing_tx, _) = watch::channel(false);
        Self {
            handle: None,
            cancel_token: None,
            capturing_tx,
        }
    }

    /// Observable lifecycle flag for dependents (UI, orchestrator).
    pub fn is_capturing(&self) -> watch::Receiver<bool> {
        self.capturing_tx.subscribe()
    }

    pub fn start(
        &mut self,
        recorder: &dyn ScreenRecorder,
        grant: CaptureGrant,
        ocr: Arc<dyn OcrEngine>,
        aggregator: Arc<ScreenContextAggregator>,
        config: CaptureConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("capture already active");
        }

        // Acquisition failure is fatal to start; the loop never begins.
        let frames = recorder
            .open_session(grant)
            .context("capture session acquisition failed")?;

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let capturing_tx = self.capturing_tx.clone();

        let _ = self.capturing_tx.send(true);
        let handle = tokio::spawn(capture_loop(
            frames,
            ocr,
            aggregator,
            config,
            token_clone,
            capturing_tx,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("capture started");
        Ok(())
    }

    /// Tear down the session. Safe to call when not capturing, and safe to
    /// call repeatedly.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let result = if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("capture loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        };

        let _ = self.capturing_tx.send(false);
        result
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}
