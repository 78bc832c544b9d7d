//! The periodic capture-and-extract loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::context::ScreenContextAggregator;
use crate::ocr::OcrEngine;
use crate::{log_error, log_info, log_warn};

use super::phash::{frame_hash, hash_distance};
use super::source::FrameSource;
use super::CaptureConfig;

const ENABLE_LOGS: bool = true;

/// Runs until cancelled. Ticks are strictly sequential: a slow tick delays
/// the next one rather than overlapping OCR calls, and cancellation drops an
/// in-flight tick promptly.
pub(crate) async fn capture_loop(
    mut frames: Box<dyn FrameSource>,
    ocr: Arc<dyn OcrEngine>,
    aggregator: Arc<ScreenContextAggregator>,
    config: CaptureConfig,
    cancel_token: CancellationToken,
    capturing_tx: watch::Sender<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_ocr_hash: Option<String> = None;
    let mut last_published = String::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let tick = perform_tick(
                    frames.as_mut(),
                    ocr.as_ref(),
                    &aggregator,
                    &config,
                    &mut last_ocr_hash,
                    &mut last_published,
                );
                tokio::select! {
                    result = tokio::time::timeout(config.tick_timeout, tick) => {
                        match result {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => log_error!("capture tick failed: {err:?}"),
                            Err(_) => log_warn!(
                                "capture tick timeout (> {:?})",
                                config.tick_timeout
                            ),
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("capture loop cancelled mid-tick");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
        }
    }

    let _ = capturing_tx.send(false);
}

async fn perform_tick(
    frames: &mut dyn FrameSource,
    ocr: &dyn OcrEngine,
    aggregator: &ScreenContextAggregator,
    config: &CaptureConfig,
    last_ocr_hash: &mut Option<String>,
    last_published: &mut String,
) -> Result<()> {
    // Non-blocking: no fresh frame means nothing to do this tick.
    let Some(frame) = frames.acquire_latest_frame() else {
        return Ok(());
    };

    let tick_start = Instant::now();
    let image = tokio::task::spawn_blocking(move || frame.to_image())
        .await
        .context("frame decode worker join failed")??;
    let decode_ms = tick_start.elapsed().as_millis();

    let image = Arc::new(image);
    let hash = tokio::task::spawn_blocking({
        let image = Arc::clone(&image);
        move || frame_hash(&image)
    })
    .await
    .context("frame hash worker join failed")?;

    if let Some(previous) = last_ocr_hash.as_deref() {
        if hash_distance(&hash, previous) < config.frame_change_threshold {
            log_info!("frame unchanged, skipping OCR (decode: {decode_ms}ms)");
            return Ok(());
        }
    }

    let ocr_start = Instant::now();
    let text = ocr
        .extract_text(&image, config.language_hint.as_deref())
        .await?
        .trim()
        .to_string();
    let ocr_ms = ocr_start.elapsed().as_millis();
    *last_ocr_hash = Some(hash);

    if !text.is_empty() && text != *last_published {
        *last_published = text.clone();
        aggregator.update_ocr(&text);
        log_info!(
            "published {} chars of OCR text (decode: {decode_ms}ms, ocr: {ocr_ms}ms)",
            text.chars().count()
        );
    }

    Ok(())
}
