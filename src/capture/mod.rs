//! Periodic screen capture feeding the OCR pipeline.
//!
//! [`controller::CaptureController`] owns the lifecycle: it opens a capture
//! session from a one-time grant, runs [`loop_worker::capture_loop`] on a
//! fixed cadence, and exposes an observable is-capturing flag. Frames are
//! transient: each tick acquires the freshest buffered frame, decodes it,
//! extracts text, publishes, and releases everything before the next tick.

pub mod controller;
pub mod frame;
pub mod loop_worker;
pub mod phash;
pub mod source;

use std::time::Duration;

pub use controller::CaptureController;
pub use frame::CaptureFrame;
pub use source::{CaptureGrant, FrameSource, ScreenRecorder};

/// Tuning for the capture loop.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Delay between ticks. Ticks never overlap; a slow OCR pass pushes the
    /// next tick back instead of stacking.
    pub interval: Duration,
    /// Upper bound on one tick (decode + OCR + publish).
    pub tick_timeout: Duration,
    /// Perceptual-hash distance below which a frame is considered unchanged
    /// and OCR is skipped.
    pub frame_change_threshold: u32,
    /// Optional language hint forwarded to the OCR subsystem.
    pub language_hint: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            tick_timeout: Duration::from_secs(10),
            frame_change_threshold: 8,
            language_hint: None,
        }
    }
}
