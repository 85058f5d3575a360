use std::sync::{Arc, Mutex, Weak};

use longshot_core::{Bitmap, CaptureError, CompositorError, Rect, ScrollOffset, Size};
use longshot_service::{CaptureResult, PaintService};
use tracing::{debug, info, warn};

use crate::bounds::BoundsManager;
use crate::compositor::Compositor;

// ── Events ────────────────────────────────────────────────────────────────────

/// Lifecycle notifications from the capture/compositor bring-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorEvent {
    /// The compositor is ready; page geometry is now known.
    CompositorReady { content_size: Size, scroll_offset: ScrollOffset },
    /// The capture step failed; no compositor will exist this session.
    CaptureFailed(CaptureError),
    /// The capture succeeded but compositor bring-up failed.
    CompositorFailed(CompositorError),
}

/// Sink for [`GeneratorEvent`]s, injected by the owner at construction.
pub type GeneratorEventSink = Arc<dyn Fn(GeneratorEvent) + Send + Sync>;

// ── Generator ─────────────────────────────────────────────────────────────────

/// Owns the external capture call for one page and lazily builds the
/// [`Compositor`] from its result.
///
/// At most one capture handle and at most one compositor exist per
/// generator; a failed capture never produces a compositor.
pub struct Generator {
    weak:          Weak<Generator>,
    service:       Arc<dyn PaintService>,
    bounds:        Arc<Mutex<BoundsManager>>,
    page_url:      String,
    directory_key: String,
    events:        GeneratorEventSink,
    inner:         Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    compositor:   Option<Arc<Compositor>>,
    /// Bitmap scale factor for this session; `0.0` until first computed.
    scale_factor: f32,
    destroyed:    bool,
}

impl Generator {
    pub fn new(
        service: Arc<dyn PaintService>,
        bounds: Arc<Mutex<BoundsManager>>,
        page_url: String,
        directory_key: String,
        events: GeneratorEventSink,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            service,
            bounds,
            page_url,
            directory_key,
            events,
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Issue exactly one capture request for the current page, resetting
    /// the cached scale factor. The async completion routes to
    /// [`process_captured_tab`](Generator::process_captured_tab).
    ///
    /// `in_memory` selects a memory-backed capture buffer over a temp file.
    pub fn capture_tab(&self, in_memory: bool) {
        let clip = self.bounds.lock().unwrap().capture_bounds();
        self.inner.lock().unwrap().scale_factor = 0.0;
        info!("capturing {} (clip {clip}, in_memory={in_memory})", self.page_url);

        let Some(this) = self.weak.upgrade() else { return };
        tokio::spawn(async move {
            let result = this.service.capture_page(clip, in_memory).await;
            this.process_captured_tab(result);
        });
    }

    /// Completion of the capture step. Builds the compositor on the first
    /// success; any other invocation releases the handle immediately. The
    /// native layer's single-fire guarantee is not trusted.
    pub fn process_captured_tab(&self, result: Result<CaptureResult, CaptureError>) {
        match result {
            Ok(capture) => {
                let mut inner = self.inner.lock().unwrap();
                if inner.destroyed || inner.compositor.is_some() {
                    drop(inner);
                    warn!("capture #{} has nowhere to go — releasing", capture.id());
                    self.service.release_capture(capture);
                    return;
                }

                let events = Arc::clone(&self.events);
                inner.compositor = Some(Compositor::new(
                    Arc::clone(&self.service),
                    capture,
                    self.page_url.clone(),
                    self.directory_key.clone(),
                    Box::new(move |result| match result {
                        Ok((content_size, scroll_offset)) => {
                            events(GeneratorEvent::CompositorReady { content_size, scroll_offset })
                        }
                        Err(status) => events(GeneratorEvent::CompositorFailed(status)),
                    }),
                ));
            }
            Err(status) => {
                warn!("capture failed: {status}");
                (self.events)(GeneratorEvent::CaptureFailed(status));
            }
        }
    }

    /// Composite `clip` from this session's capture into a bitmap. The
    /// bitmap scale factor is computed on first use; captures are
    /// scale-stable for a session.
    ///
    /// Returns an error (rather than panicking) after
    /// [`destroy`](Generator::destroy): in-flight tile requests may
    /// legitimately race teardown.
    ///
    /// # Panics
    ///
    /// If no compositor exists yet. Requesting bitmaps before the capture
    /// has composited is a caller ordering bug.
    pub async fn composite_bitmap(&self, clip: Rect) -> Result<Bitmap, CompositorError> {
        let (compositor, cached) = {
            let inner = self.inner.lock().unwrap();
            if inner.destroyed {
                debug!("composite_bitmap after destroy — dropping request for {clip}");
                return Err(CompositorError::BitmapFailed);
            }
            let compositor = inner
                .compositor
                .clone()
                .expect("composite_bitmap called before the compositor exists");
            (compositor, inner.scale_factor)
        };

        let scale_factor = if cached == 0.0 {
            let computed = self.bounds.lock().unwrap().bitmap_scale_factor();
            self.inner.lock().unwrap().scale_factor = computed;
            debug!("bitmap scale factor {computed}");
            computed
        } else {
            cached
        };

        compositor.request_bitmap(clip, scale_factor).await
    }

    /// Composited content dimensions; `None` before compositor readiness.
    pub fn content_size(&self) -> Option<Size> {
        let inner = self.inner.lock().unwrap();
        inner.compositor.as_ref().and_then(|c| c.content_size())
    }

    /// Captured scroll position; `None` before compositor readiness.
    pub fn scroll_offset(&self) -> Option<ScrollOffset> {
        let inner = self.inner.lock().unwrap();
        inner.compositor.as_ref().and_then(|c| c.scroll_offset())
    }

    /// Destroy the compositor (if any) and end the native long-screenshot
    /// session. Idempotent; in-flight completions arriving afterwards are
    /// absorbed.
    pub fn destroy(&self) {
        let compositor = {
            let mut inner = self.inner.lock().unwrap();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            inner.compositor.take()
        };
        if let Some(compositor) = compositor {
            compositor.destroy();
        }
        self.service.close_session();
    }
}
