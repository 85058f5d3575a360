use std::sync::{Arc, Mutex};

use longshot_core::{Bitmap, CompositorError, Rect, ScrollOffset, Size};
use longshot_service::{CaptureResult, CompositorFrame, CompositorHandle, PaintService};
use tracing::{debug, warn};

/// One-shot completion for compositor bring-up: page geometry on success,
/// the mapped native status on failure.
pub type CompositorDoneCallback =
    Box<dyn FnOnce(Result<(Size, ScrollOffset), CompositorError>) + Send>;

/// Wraps one successful capture result and turns rectangle requests into
/// bitmaps via the native service.
///
/// Page geometry (content size, scroll offset) is unknown until the native
/// bring-up completes; [`request_bitmap`](Compositor::request_bitmap) must
/// not be called before then.
pub struct Compositor {
    service: Arc<dyn PaintService>,
    inner:   Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    handle:            Option<CompositorHandle>,
    content_size:      Option<Size>,
    scroll_offset:     Option<ScrollOffset>,
    page_scale_factor: Option<f32>,
    destroyed:         bool,
}

impl Compositor {
    /// Hand `capture` to the native service and asynchronously parse it
    /// into a live compositor instance.
    ///
    /// `on_done` fires at most once. If [`destroy`](Compositor::destroy)
    /// lands while bring-up is still in flight, the late completion is
    /// absorbed: the returned handle is destroyed immediately and `on_done`
    /// is never invoked.
    pub fn new(
        service: Arc<dyn PaintService>,
        capture: CaptureResult,
        page_url: String,
        directory_key: String,
        on_done: CompositorDoneCallback,
    ) -> Arc<Self> {
        let this = Arc::new(Self { service, inner: Mutex::new(Inner::default()) });

        let task = Arc::clone(&this);
        tokio::spawn(async move {
            let result = task
                .service
                .create_compositor(capture, &page_url, &directory_key)
                .await;
            task.finish_init(result, on_done);
        });

        this
    }

    fn finish_init(
        &self,
        result: Result<CompositorFrame, CompositorError>,
        on_done: CompositorDoneCallback,
    ) {
        match result {
            Ok(frame) => {
                let CompositorFrame { compositor, content_size, scroll_offset, page_scale_factor } =
                    frame;
                {
                    let mut inner = self.inner.lock().unwrap();
                    if inner.destroyed {
                        drop(inner);
                        debug!("{} became ready after destroy — discarding", compositor.id());
                        self.service.destroy_compositor(compositor);
                        return;
                    }
                    inner.content_size = Some(content_size);
                    inner.scroll_offset = Some(scroll_offset);
                    inner.page_scale_factor = Some(page_scale_factor);
                    inner.handle = Some(compositor);
                }
                on_done(Ok((content_size, scroll_offset)));
            }
            Err(status) => {
                if self.inner.lock().unwrap().destroyed {
                    return;
                }
                warn!("compositor bring-up failed: {status}");
                on_done(Err(status));
            }
        }
    }

    /// Composite `clip` at `scale_factor` into a bitmap. Concurrent
    /// requests are independent; completions arrive in any order.
    ///
    /// # Panics
    ///
    /// If called before the ready callback has fired, or after
    /// [`destroy`](Compositor::destroy); both are caller ordering bugs.
    pub async fn request_bitmap(
        &self,
        clip: Rect,
        scale_factor: f32,
    ) -> Result<Bitmap, CompositorError> {
        let compositor_id = {
            let inner = self.inner.lock().unwrap();
            assert!(!inner.destroyed, "request_bitmap called on a destroyed compositor");
            inner
                .handle
                .as_ref()
                .expect("request_bitmap called before the compositor reported ready")
                .id()
        };
        self.service.request_bitmap(compositor_id, clip, scale_factor).await
    }

    /// Composited content dimensions; `None` until ready.
    pub fn content_size(&self) -> Option<Size> {
        self.inner.lock().unwrap().content_size
    }

    /// Scroll position recorded in the capture; `None` until ready.
    pub fn scroll_offset(&self) -> Option<ScrollOffset> {
        self.inner.lock().unwrap().scroll_offset
    }

    /// Page scale the frame was serialized at; `None` until ready.
    pub fn page_scale_factor(&self) -> Option<f32> {
        self.inner.lock().unwrap().page_scale_factor
    }

    /// Release the native compositor instance. Idempotent, and safe to call
    /// while bring-up is still in flight.
    pub fn destroy(&self) {
        let handle = {
            let mut inner = self.inner.lock().unwrap();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            inner.handle.take()
        };
        if let Some(handle) = handle {
            self.service.destroy_compositor(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingPaintService, ServiceCall};
    use longshot_core::CaptureError;
    use tokio::sync::oneshot;

    type Done = Result<(Size, ScrollOffset), CompositorError>;

    fn done_channel() -> (CompositorDoneCallback, oneshot::Receiver<Done>) {
        let (tx, rx) = oneshot::channel();
        (Box::new(move |result| { let _ = tx.send(result); }), rx)
    }

    async fn capture(service: &Arc<RecordingPaintService>) -> CaptureResult {
        service
            .capture_page(Rect::vertical_span(0, 9_999), true)
            .await
            .expect("scripted capture succeeds")
    }

    #[tokio::test]
    async fn ready_exposes_geometry_and_serves_bitmaps() {
        let service = RecordingPaintService::ok(Size::new(1080, 5_000), ScrollOffset::new(0, 40));
        let capture = capture(&service).await;
        let (on_done, rx) = done_channel();
        let compositor = Compositor::new(
            service.clone(),
            capture,
            "https://example.com".into(),
            "session-key".into(),
            on_done,
        );

        let geometry = rx.await.expect("on_done fires").expect("bring-up succeeds");
        assert_eq!(geometry, (Size::new(1080, 5_000), ScrollOffset::new(0, 40)));
        assert_eq!(compositor.content_size(), Some(Size::new(1080, 5_000)));
        assert_eq!(compositor.scroll_offset(), Some(ScrollOffset::new(0, 40)));

        let bitmap = compositor
            .request_bitmap(Rect::vertical_span(0, 1_000), 1.0)
            .await
            .expect("scripted bitmap succeeds");
        assert!(bitmap.byte_count() > 0);
    }

    #[tokio::test]
    async fn bring_up_failure_reports_status() {
        let service = RecordingPaintService::failing_compositor(CompositorError::SkippedMemoryPressure);
        let capture = capture(&service).await;
        let (on_done, rx) = done_channel();
        let _compositor = Compositor::new(
            service.clone(),
            capture,
            "https://example.com".into(),
            "session-key".into(),
            on_done,
        );

        assert_eq!(rx.await.unwrap(), Err(CompositorError::SkippedMemoryPressure));
    }

    #[tokio::test]
    async fn destroy_racing_bring_up_discards_the_handle() {
        let service = RecordingPaintService::ok(Size::new(1080, 5_000), ScrollOffset::default());
        let capture = capture(&service).await;
        let (on_done, mut rx) = done_channel();
        let compositor = Compositor::new(
            service.clone(),
            capture,
            "https://example.com".into(),
            "session-key".into(),
            on_done,
        );

        // Destroy before the spawned bring-up task has run.
        compositor.destroy();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(rx.try_recv().is_err(), "on_done must not fire after destroy");
        assert_eq!(
            service.count(|c| matches!(c, ServiceCall::DestroyCompositor { .. })),
            1,
            "the late handle is released exactly once"
        );
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let service = RecordingPaintService::ok(Size::new(1080, 5_000), ScrollOffset::default());
        let capture = capture(&service).await;
        let (on_done, rx) = done_channel();
        let compositor = Compositor::new(
            service.clone(),
            capture,
            "https://example.com".into(),
            "session-key".into(),
            on_done,
        );
        rx.await.unwrap().unwrap();

        compositor.destroy();
        compositor.destroy();
        assert_eq!(
            service.count(|c| matches!(c, ServiceCall::DestroyCompositor { .. })),
            1
        );
    }

    #[tokio::test]
    #[should_panic(expected = "before the compositor reported ready")]
    async fn request_bitmap_before_ready_is_a_contract_violation() {
        let service = RecordingPaintService::failing_capture(CaptureError::Failed);
        let compositor = Compositor::new(
            service.clone(),
            CaptureResult::new(7),
            "https://example.com".into(),
            "session-key".into(),
            Box::new(|_| {}),
        );
        let _ = compositor.request_bitmap(Rect::vertical_span(0, 100), 1.0).await;
    }
}
