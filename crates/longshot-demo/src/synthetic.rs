//! In-process [`PaintService`] that "captures" a synthetic page.
//!
//! The page is a vertical gradient: every rendered row encodes its document
//! y-position in the red channel, so a composited tile can be checked
//! against the rectangle that requested it. Completions are delivered on a
//! later event-loop turn, like the real native service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use longshot_core::{
    Bitmap, CaptureError, CompositorError, PixelFormat, Rect, ScrollOffset, Size,
};
use longshot_service::{
    CaptureResult, CompositorFrame, CompositorHandle, CompositorId, PaintService,
};
use tracing::{debug, info};

/// PaintService rendering a deterministic gradient page entirely in process.
pub struct SyntheticPaintService {
    content_size:  Size,
    scroll_offset: ScrollOffset,
    next_id:       AtomicU64,
}

impl SyntheticPaintService {
    pub fn new(content_size: Size, scroll_offset: ScrollOffset) -> Self {
        Self { content_size, scroll_offset, next_id: AtomicU64::new(1) }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Render `clip` at `scale_factor`. Row colors encode the document
    /// y-position; a zero-width clip spans the full content width.
    fn render(&self, clip: Rect, scale_factor: f32) -> Bitmap {
        let doc_width = if clip.width() > 0 { clip.width() } else { self.content_size.width };
        let width = ((doc_width as f32 * scale_factor).round() as u32).max(1);
        let height = ((clip.height() as f32 * scale_factor).round() as u32).max(1);

        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for row in 0..height {
            let doc_y = clip.top + (row as f32 / scale_factor) as i32;
            let shade = ((doc_y * 255) / self.content_size.height.max(1)).clamp(0, 255) as u8;
            for _ in 0..width {
                pixels.extend_from_slice(&[shade, 0x20, 0x80, 0xff]);
            }
        }
        Bitmap::new(Bytes::from(pixels), width, height, PixelFormat::Rgba8888)
    }
}

#[async_trait]
impl PaintService for SyntheticPaintService {
    async fn capture_page(
        &self,
        clip: Rect,
        in_memory: bool,
    ) -> Result<CaptureResult, CaptureError> {
        info!("serializing page paint within {clip} (in_memory={in_memory})");
        tokio::time::sleep(Duration::from_millis(15)).await;
        Ok(CaptureResult::new(self.next_id()))
    }

    fn release_capture(&self, capture: CaptureResult) {
        debug!("released capture #{}", capture.id());
    }

    async fn create_compositor(
        &self,
        capture: CaptureResult,
        url: &str,
        directory_key: &str,
    ) -> Result<CompositorFrame, CompositorError> {
        debug!("parsing capture #{} for {url} (key {directory_key})", capture.id());
        tokio::time::sleep(Duration::from_millis(15)).await;
        Ok(CompositorFrame {
            compositor: CompositorHandle::new(CompositorId(self.next_id())),
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
        debug!("compositing {clip} at {scale_factor} via {compositor}");
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.render(clip, scale_factor))
    }

    fn destroy_compositor(&self, compositor: CompositorHandle) {
        debug!("destroyed {}", compositor.id());
    }

    fn close_session(&self) {
        info!("long-screenshot session closed");
    }
}
