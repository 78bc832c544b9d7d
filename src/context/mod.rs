//! Screen context aggregation.
//!
//! A single process-wide record merging the newest OCR text, accessibility
//! summary, and foreground-app identity. The capture loop and the
//! accessibility observer write disjoint fields independently; readers always
//! get a fully-formed copy, never a record under mutation.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

/// Per-field character cap applied on write.
pub const MAX_TEXT_CHARS: usize = 600;

/// Default cap on the rendered context summary.
pub const DEFAULT_RENDER_CAP: usize = 600;

/// The latest merged view of what is on screen.
///
/// Fields are independently last-write-wins; they may reflect different
/// moments in time. `timestamp_ms` tracks recency of the newest write only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenContext {
    pub app_package: String,
    pub activity: String,
    pub ocr_text: String,
    pub accessibility_text: String,
    pub focused_node: String,
    pub timestamp_ms: i64,
}

/// Copy-on-read store for the current [`ScreenContext`].
///
/// Each update replaces the whole record under a write lock, so two
/// producers can run concurrently without a reader ever observing a
/// half-written snapshot.
pub struct ScreenContextAggregator {
    state: RwLock<ScreenContext>,
    max_text_chars: usize,
    render_cap: usize,
}

impl Default for ScreenContextAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenContextAggregator {
    pub fn new() -> Self {
        Self::with_limits(MAX_TEXT_CHARS, DEFAULT_RENDER_CAP)
    }

    pub fn with_limits(max_text_chars: usize, render_cap: usize) -> Self {
        Self {
            state: RwLock::new(ScreenContext::default()),
            max_text_chars,
            render_cap,
        }
    }

    /// Replace the OCR text field. Blank input is a no-op so a failed
    /// extraction never erases the last good reading.
    pub fn update_ocr(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let bounded = truncate_chars(text, self.max_text_chars);
        let mut guard = self.state.write();
        guard.ocr_text = bounded;
        guard.timestamp_ms = now_ms();
    }

    /// Replace the accessibility summary and focused-node fields.
    /// A no-op when both the summary and the focused text are blank.
    /// `package` keeps the prior value when absent.
    pub fn update_accessibility(&self, text: &str, focused: Option<&str>, package: Option<&str>) {
        let focused = focused.unwrap_or("");
        if text.trim().is_empty() && focused.trim().is_empty() {
            return;
        }
        let mut guard = self.state.write();
        if let Some(pkg) = package {
            guard.app_package = pkg.to_string();
        }
        guard.accessibility_text = truncate_chars(text, self.max_text_chars);
        guard.focused_node = truncate_chars(focused, self.max_text_chars);
        guard.timestamp_ms = now_ms();
    }

    /// Replace the foreground-app identity fields.
    pub fn update_app(&self, package: Option<&str>, activity: Option<&str>) {
        if package.map_or(true, str::is_empty) && activity.map_or(true, str::is_empty) {
            return;
        }
        let mut guard = self.state.write();
        guard.app_package = package.unwrap_or("").to_string();
        guard.activity = activity.unwrap_or("").to_string();
        guard.timestamp_ms = now_ms();
    }

    /// An immutable copy of the current record.
    pub fn snapshot(&self) -> ScreenContext {
        self.state.read().clone()
    }

    /// A compact textual summary for prompt construction, hard-capped in
    /// length regardless of how much text was captured.
    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();
        if !snapshot.app_package.trim().is_empty() {
            out.push_str(&format!("App: {}", snapshot.app_package));
            if !snapshot.activity.trim().is_empty() {
                out.push_str(&format!("/{}", snapshot.activity));
            }
            out.push_str(" • ");
        }
        if !snapshot.ocr_text.trim().is_empty() {
            out.push_str(&format!("OCR: \"{}\"", truncate_chars(&snapshot.ocr_text, 200)));
            out.push_str(" • ");
        }
        if !snapshot.accessibility_text.trim().is_empty() {
            out.push_str(&format!("UI: {}", truncate_chars(&snapshot.accessibility_text, 200)));
            out.push_str(" • ");
        }
        if !snapshot.focused_node.trim().is_empty() {
            out.push_str(&format!("Focus: {}", truncate_chars(&snapshot.focused_node, 80)));
        }
        if out.is_empty() {
            return "No screen context available".to_string();
        }
        truncate_chars(out.trim_end_matches(" • "), self.render_cap)
    }

    /// Clear every field back to its initial state.
    pub fn reset(&self) {
        *self.state.write() = ScreenContext::default();
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
