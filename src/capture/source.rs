//! Boundary to the platform's privileged screen-capture facility.

use anyhow::Result;

use super::frame::CaptureFrame;

/// One-time authorization to open a capture session, issued by the
/// platform's consent flow. Consumed by value: once spent it cannot be
/// reused, and a fresh grant requires new user consent.
#[derive(Debug)]
pub struct CaptureGrant {
    _private: (),
}

impl CaptureGrant {
    /// Wrap a platform-issued authorization. The caller is responsible for
    /// only minting this after real consent.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for CaptureGrant {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink of captured frames, latest-wins.
///
/// Implementations buffer at most two frames: enough to ride out transient
/// jitter, shallow enough that acquisition always prefers freshness.
/// `acquire_latest_frame` must not block; `None` means nothing new arrived
/// since the last acquisition.
pub trait FrameSource: Send {
    fn acquire_latest_frame(&mut self) -> Option<CaptureFrame>;
}

/// Factory for capture sessions. A process holds at most one live session;
/// opening fails if the grant is invalid or the capture handle cannot be
/// acquired, and that failure is fatal to `start()`.
pub trait ScreenRecorder: Send + Sync {
    fn open_session(&self, grant: CaptureGrant) -> Result<Box<dyn FrameSource>>;
}
