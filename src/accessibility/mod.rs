//! Event-driven accessibility-tree introspection.
//!
//! The platform delivers events synchronously; [`AccessibilityObserver`]
//! walks the active tree inside the callback, publishes one aggregator
//! update, and returns promptly. Node handles are scoped resources released
//! by `Drop` on every path, and nothing that happens during a traversal is
//! allowed to escape the callback.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::warn;

use crate::context::ScreenContextAggregator;

/// Identity payload of one platform accessibility event.
#[derive(Debug, Clone, Default)]
pub struct AccessibilityEvent {
    pub package_name: Option<String>,
    pub class_name: Option<String>,
}

/// Scoped handle onto one UI-tree node.
///
/// Handles acquired through [`NodeHandle::child`] borrow their parent and are
/// released when dropped; implementations wrap whatever must-be-freed native
/// resource the platform hands out.
pub trait NodeHandle {
    fn text(&self) -> Option<String>;
    fn content_description(&self) -> Option<String>;
    fn child_count(&self) -> usize;
    fn child(&self, index: usize) -> Option<Box<dyn NodeHandle + '_>>;
}

pub struct AccessibilityObserver {
    aggregator: Arc<ScreenContextAggregator>,
}

impl AccessibilityObserver {
    pub fn new(aggregator: Arc<ScreenContextAggregator>) -> Self {
        Self { aggregator }
    }

    /// Handle one event. `root` is the active window's tree root (absent is a
    /// normal no-op, not an error); `source` is the event's focused node.
    /// Never panics out of the callback.
    pub fn on_event(
        &self,
        event: &AccessibilityEvent,
        root: Option<&dyn NodeHandle>,
        source: Option<&dyn NodeHandle>,
    ) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.process(event, root, source)));
        if outcome.is_err() {
            warn!("accessibility traversal panicked; event dropped");
        }
    }

    fn process(
        &self,
        event: &AccessibilityEvent,
        root: Option<&dyn NodeHandle>,
        source: Option<&dyn NodeHandle>,
    ) {
        let Some(root) = root else {
            return;
        };

        let mut lines = Vec::new();
        collect_text(root, &mut lines);

        let focused = source.and_then(|node| node.text()).unwrap_or_default();
        let summary = lines
            .iter()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join(" • ");

        self.aggregator.update_accessibility(
            &summary,
            Some(&focused),
            event.package_name.as_deref(),
        );
        self.aggregator
            .update_app(event.package_name.as_deref(), event.class_name.as_deref());
    }
}

/// Depth-first text collection in structural order. Child handles live only
/// for their own subtree visit.
fn collect_text(node: &dyn NodeHandle, out: &mut Vec<String>) {
    let text = node.text().unwrap_or_default();
    if !text.trim().is_empty() {
        out.push(text.clone());
    }
    if let Some(desc) = node.content_description() {
        if !desc.trim().is_empty() && desc != text {
            out.push(desc);
        }
    }
    for index in 0..node.child_count() {
        if let Some(child) = node.child(index) {
            collect_text(child.as_ref(), out);
        }
    }
}
