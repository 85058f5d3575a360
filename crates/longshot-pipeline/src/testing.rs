//! Scripted in-process [`PaintService`] for the pipeline tests.
//!
//! Records every observable interaction in call order so tests can assert
//! exactly-once release semantics, and yields once per async method so
//! completions land on a later turn of the event loop, the way the real
//! native service behaves.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use longshot_core::{
    Bitmap, CaptureError, CompositorError, PixelFormat, Rect, ScrollOffset, Size,
};
use longshot_service::{
    CaptureResult, CompositorFrame, CompositorHandle, CompositorId, PaintService,
};

/// Every observable interaction with the fake, in call order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ServiceCall {
    Capture { clip: Rect, in_memory: bool },
    ReleaseCapture { id: u64 },
    CreateCompositor { capture_id: u64 },
    RequestBitmap { clip: Rect, scale_factor: f32 },
    DestroyCompositor { id: CompositorId },
    CloseSession,
}

pub(crate) struct RecordingPaintService {
    capture_error:    Option<CaptureError>,
    compositor_error: Option<CompositorError>,
    bitmap_error:     Mutex<Option<CompositorError>>,
    content_size:     Size,
    scroll_offset:    ScrollOffset,
    calls:            Mutex<Vec<ServiceCall>>,
    next_id:          AtomicU64,
    live_captures:    Mutex<HashSet<u64>>,
    live_compositors: Mutex<HashSet<CompositorId>>,
}

impl RecordingPaintService {
    fn build(
        capture_error: Option<CaptureError>,
        compositor_error: Option<CompositorError>,
        content_size: Size,
        scroll_offset: ScrollOffset,
    ) -> Arc<Self> {
        Arc::new(Self {
            capture_error,
            compositor_error,
            bitmap_error: Mutex::new(None),
            content_size,
            scroll_offset,
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            live_captures: Mutex::new(HashSet::new()),
            live_compositors: Mutex::new(HashSet::new()),
        })
    }

    /// Every step succeeds; the compositor reports this page geometry.
    pub fn ok(content_size: Size, scroll_offset: ScrollOffset) -> Arc<Self> {
        Self::build(None, None, content_size, scroll_offset)
    }

    /// The capture step fails with `error`.
    pub fn failing_capture(error: CaptureError) -> Arc<Self> {
        Self::build(Some(error), None, Size::new(0, 0), ScrollOffset::default())
    }

    /// The capture succeeds but compositor bring-up fails with `error`.
    pub fn failing_compositor(error: CompositorError) -> Arc<Self> {
        Self::build(None, Some(error), Size::new(0, 0), ScrollOffset::default())
    }

    /// Fail all bitmap requests from now on.
    pub fn fail_bitmaps(&self, error: CompositorError) {
        *self.bitmap_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matcher: impl Fn(&ServiceCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matcher(c)).count()
    }

    fn log(&self, call: ServiceCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl PaintService for RecordingPaintService {
    async fn capture_page(
        &self,
        clip: Rect,
        in_memory: bool,
    ) -> Result<CaptureResult, CaptureError> {
        self.log(ServiceCall::Capture { clip, in_memory });
        tokio::task::yield_now().await;
        if let Some(error) = self.capture_error {
            return Err(error);
        }
        let id = self.next_id();
        self.live_captures.lock().unwrap().insert(id);
        Ok(CaptureResult::new(id))
    }

    fn release_capture(&self, capture: CaptureResult) {
        let id = capture.id();
        assert!(
            self.live_captures.lock().unwrap().remove(&id),
            "double release of capture #{id}"
        );
        self.log(ServiceCall::ReleaseCapture { id });
    }

    async fn create_compositor(
        &self,
        capture: CaptureResult,
        _url: &str,
        _directory_key: &str,
    ) -> Result<CompositorFrame, CompositorError> {
        let capture_id = capture.id();
        assert!(
            self.live_captures.lock().unwrap().remove(&capture_id),
            "compositor built from an unknown or already-consumed capture #{capture_id}"
        );
        self.log(ServiceCall::CreateCompositor { capture_id });
        tokio::task::yield_now().await;
        if let Some(error) = self.compositor_error {
            return Err(error);
        }
        let id = CompositorId(self.next_id());
        self.live_compositors.lock().unwrap().insert(id);
        Ok(CompositorFrame {
            compositor: CompositorHandle::new(id),
            content_size: self.content_size,
            scroll_offset: self.scroll_offset,
            page_scale_factor: 1.0,
        })
    }

    async fn request_bitmap(
        &self,
        compositor: CompositorId,
        clip: Rect,
        scale_factor: f32,
    ) -> Result<Bitmap, CompositorError> {
        assert!(
            self.live_compositors.lock().unwrap().contains(&compositor),
            "bitmap requested against unknown {compositor}"
        );
        self.log(ServiceCall::RequestBitmap { clip, scale_factor });
        tokio::task::yield_now().await;
        if let Some(error) = *self.bitmap_error.lock().unwrap() {
            return Err(error);
        }
        // Fixed 64×64 RGBA tile: 16 KiB, so memory accounting is easy to
        // assert on.
        Ok(Bitmap::new(Bytes::from(vec![0u8; 64 * 64 * 4]), 64, 64, PixelFormat::Rgba8888))
    }

    fn destroy_compositor(&self, compositor: CompositorHandle) {
        let id = compositor.id();
        assert!(
            self.live_compositors.lock().unwrap().remove(&id),
            "double destroy of {id}"
        );
        self.log(ServiceCall::DestroyCompositor { id });
    }

    fn close_session(&self) {
        self.log(ServiceCall::CloseSession);
    }
}
