//! The frame hand-off between a tab's worker and the compositor.

use kestrel_css::DisplayList;

/// Identifies a tab for the lifetime of the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

/// One finished frame, moved from the worker to the compositor.
///
/// The worker builds it at the end of a render and gives up ownership on
/// commit; nothing in it is shared with the worker afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitData {
    /// The tab's current URL.
    pub url: Option<String>,
    /// New scroll offset, set only when the tab itself changed it
    /// (navigation, clamping). `None` leaves the compositor's value alone.
    pub scroll: Option<f32>,
    /// Total content height including the page margins.
    pub height: f32,
    /// The new display list, or `None` if nothing was re-rendered since
    /// the previous commit.
    pub display_list: Option<DisplayList>,
}

/// Receiver of tab frames. Implemented by the compositor.
pub trait FrameSink: Send + Sync {
    /// Hand a finished frame to the compositor. Frames from a tab that is
    /// no longer active are dropped.
    fn commit(&self, tab: TabId, data: CommitData);

    /// Ask for `run_animation_frame` to be scheduled on `tab` at the next
    /// timer tick.
    fn set_needs_animation_frame(&self, tab: TabId);
}

/// Clamp a scroll offset to `[0, max(0, content_height - viewport_height)]`.
///
/// Used by both the tab (after layout) and the compositor (for scroll
/// input), so both agree on where the page ends.
#[must_use]
pub fn clamp_scroll(scroll: f32, content_height: f32, viewport_height: f32) -> f32 {
    let max_scroll = (content_height - viewport_height).max(0.0);
    scroll.clamp(0.0, max_scroll)
}

/// Content height of a laid-out document: its box height plus a margin of
/// `vstep` above and below, rounded up to whole pixels.
#[must_use]
pub fn content_height(document_height: f32, vstep: f32) -> f32 {
    2.0f32.mul_add(vstep, document_height).ceil()
}
