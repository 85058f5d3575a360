//! longshot-service — boundary to the native paint/compositing service.
//!
//! The native side serializes a page's paint output into an opaque buffer
//! ("capture"), parses that buffer into a compositor instance, and turns
//! (rectangle, scale) requests into bitmaps. Everything behind this trait is
//! out-of-process from the pipeline's point of view: every async method may
//! complete on a later turn of the event loop.
//!
//! ```text
//! capture_page(clip) ──► CaptureResult ──► create_compositor ──► CompositorFrame
//!                                                                     │
//!                                        request_bitmap(id, rect, scale)…
//! ```
//!
//! # Handle ownership
//!
//! [`CaptureResult`] and [`CompositorHandle`] are owned resources with a
//! single designated owner at any point in time; transferring one is a move.
//! Every capture handle must end up in exactly one of
//! [`PaintService::create_compositor`] or [`PaintService::release_capture`],
//! and every compositor handle in [`PaintService::destroy_compositor`].

use async_trait::async_trait;
use longshot_core::{Bitmap, CaptureError, CompositorError, Rect, ScrollOffset, Size};

// ── Handles ───────────────────────────────────────────────────────────────────

/// Copyable token naming a live compositor instance in bitmap requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompositorId(pub u64);

impl std::fmt::Display for CompositorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compositor#{}", self.0)
    }
}

/// Opaque handle to a serialized page capture held by the native service.
///
/// Deliberately not `Clone`: the holder is the owner, and handing the
/// capture to a compositor (or releasing it) consumes the handle.
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureResult {
    id: u64,
}

impl CaptureResult {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Owned reference to a live compositor instance. Not `Clone`; destroyed by
/// moving it into [`PaintService::destroy_compositor`].
#[derive(Debug, PartialEq, Eq)]
pub struct CompositorHandle {
    id: CompositorId,
}

impl CompositorHandle {
    pub fn new(id: CompositorId) -> Self {
        Self { id }
    }

    /// The copyable token used for bitmap requests against this instance.
    pub fn id(&self) -> CompositorId {
        self.id
    }
}

// ── CompositorFrame ───────────────────────────────────────────────────────────

/// Payload of a successful compositor bring-up: the handle plus the page
/// geometry the capture recorded.
#[derive(Debug)]
pub struct CompositorFrame {
    pub compositor: CompositorHandle,
    /// Composited content dimensions in device pixels.
    pub content_size: Size,
    /// Page scroll position at capture time.
    pub scroll_offset: ScrollOffset,
    /// Page scale the frame was serialized at.
    pub page_scale_factor: f32,
}

// ── PaintService ──────────────────────────────────────────────────────────────

/// Interface to the native capture/compositing service.
///
/// Implementations must deliver completions without any ordering guarantee
/// between concurrent [`request_bitmap`](PaintService::request_bitmap)
/// calls. The single-fire guarantee of the native completion callbacks is
/// not trusted by callers — the pipeline re-checks state on every
/// completion path.
#[async_trait]
pub trait PaintService: Send + Sync {
    /// Serialize the current page's paint output within `clip`.
    ///
    /// `in_memory` selects a memory-backed capture buffer over a temp file.
    async fn capture_page(&self, clip: Rect, in_memory: bool)
        -> Result<CaptureResult, CaptureError>;

    /// Release a capture that will not be handed to a compositor. Must be
    /// called exactly once for every unconsumed [`CaptureResult`].
    fn release_capture(&self, capture: CaptureResult);

    /// Parse `capture` and stand up a compositor instance for it. Takes
    /// ownership of the capture whether or not parsing succeeds.
    async fn create_compositor(&self, capture: CaptureResult, url: &str, directory_key: &str)
        -> Result<CompositorFrame, CompositorError>;

    /// Composite `clip` at `scale_factor` into a bitmap. Concurrent
    /// requests against one compositor are independent.
    async fn request_bitmap(&self, compositor: CompositorId, clip: Rect, scale_factor: f32)
        -> Result<Bitmap, CompositorError>;

    /// Tear down a compositor instance, releasing its capture buffer.
    fn destroy_compositor(&self, compositor: CompositorHandle);

    /// The long-screenshot session ended; release any session-scoped
    /// native resources.
    fn close_session(&self);
}
