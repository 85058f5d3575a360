use std::sync::{Arc, Mutex, Weak};

use longshot_core::{Bitmap, Rect};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::generator::Generator;

// ── EntryStatus ───────────────────────────────────────────────────────────────

/// Lifecycle status of one requested tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Initial state.
    Unknown,
    /// Waiting for the session capture to finish.
    Queued,
    /// A capture covering this entry is running.
    CaptureInProgress,
    /// Captured; no bitmap requested yet.
    CaptureComplete,
    BitmapGenerationInProgress,
    /// Terminal: the bitmap is available.
    BitmapGenerated,
    /// Terminal: this tile (or the session) failed.
    GenerationError,
    /// Terminal: memory pressure ended the session.
    InsufficientMemory,
    /// The requested bounds end above the captured window. Reserved for
    /// incremental-scroll callers.
    BoundsAboveCapture,
    /// The requested bounds start below the captured window. Reserved for
    /// incremental-scroll callers.
    BoundsBelowCapture,
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BitmapGenerated | Self::GenerationError | Self::InsufficientMemory
        )
    }
}

/// Invoked at most once, with the allocated byte count of a successfully
/// generated bitmap.
pub(crate) type MemorySink = Box<dyn FnOnce(usize) + Send>;

// ── Entry ─────────────────────────────────────────────────────────────────────

/// One requested rectangular region of the captured page: its bounds, its
/// status, and (once generated) its bitmap.
///
/// Identified by the top coordinate of the requested rectangle; callers
/// must keep that unique among concurrently live entries of one capture.
/// Destruction is always explicit ([`destroy`](Entry::destroy)), never
/// implicit.
pub struct Entry {
    weak:      Weak<Entry>,
    bounds:    Option<Rect>,
    status_tx: watch::Sender<EntryStatus>,
    inner:     Mutex<Inner>,
}

struct Inner {
    generator:   Option<Arc<Generator>>,
    bitmap:      Option<Bitmap>,
    memory_sink: Option<MemorySink>,
}

impl Entry {
    pub(crate) fn new(bounds: Rect, generator: Arc<Generator>, memory_sink: MemorySink) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            bounds: Some(bounds),
            status_tx: watch::Sender::new(EntryStatus::Unknown),
            inner: Mutex::new(Inner {
                generator: Some(generator),
                bitmap: None,
                memory_sink: Some(memory_sink),
            }),
        })
    }

    /// Bounds-less placeholder carrying only a status (id `-1`). Owners use
    /// these as displayable stand-ins when a session fails.
    pub fn with_status(status: EntryStatus) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            bounds: None,
            status_tx: watch::Sender::new(status),
            inner: Mutex::new(Inner { generator: None, bitmap: None, memory_sink: None }),
        })
    }

    /// Stable key for callers: the top coordinate of the requested
    /// rectangle, `-1` for a placeholder.
    pub fn id(&self) -> i32 {
        self.bounds.map_or(-1, |b| b.top)
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn status(&self) -> EntryStatus {
        *self.status_tx.borrow()
    }

    /// Watch status changes. The receiver observes the current status
    /// immediately; subscribing after a terminal status still sees it.
    pub fn watch_status(&self) -> watch::Receiver<EntryStatus> {
        self.status_tx.subscribe()
    }

    /// The generated bitmap; present only once the status is
    /// [`EntryStatus::BitmapGenerated`].
    pub fn bitmap(&self) -> Option<Bitmap> {
        self.inner.lock().unwrap().bitmap.clone()
    }

    /// Unconditional status overwrite. The owning coordinator uses this to
    /// fan a session-level failure out to queued entries.
    pub(crate) fn update_status(&self, status: EntryStatus) {
        self.status_tx.send_replace(status);
    }

    /// Request bitmap generation for this entry's bounds.
    ///
    /// Without a generator (placeholder, or destroyed while the request was
    /// queued) the entry fails over to [`EntryStatus::GenerationError`]
    /// rather than panicking; stragglers racing teardown are absorbed.
    pub(crate) fn generate_bitmap(&self) {
        let (generator, bounds) = {
            let inner = self.inner.lock().unwrap();
            match (inner.generator.clone(), self.bounds) {
                (Some(generator), Some(bounds)) => (generator, bounds),
                _ => {
                    drop(inner);
                    warn!("entry {} has no generator — cannot composite", self.id());
                    self.update_status(EntryStatus::GenerationError);
                    return;
                }
            }
        };

        self.update_status(EntryStatus::BitmapGenerationInProgress);
        let Some(entry) = self.weak.upgrade() else { return };
        tokio::spawn(async move {
            match generator.composite_bitmap(bounds).await {
                Ok(bitmap) => entry.on_bitmap(bitmap),
                Err(status) => {
                    warn!("entry {} bitmap generation failed: {status}", entry.id());
                    entry.update_status(EntryStatus::GenerationError);
                }
            }
        });
    }

    fn on_bitmap(&self, bitmap: Bitmap) {
        let accounted = {
            let mut inner = self.inner.lock().unwrap();
            if inner.generator.is_none() {
                debug!("entry {} completed after destroy — dropping bitmap", self.id());
                return;
            }
            let byte_count = bitmap.byte_count();
            inner.bitmap = Some(bitmap);
            inner.memory_sink.take().map(|sink| (sink, byte_count))
        };
        if let Some((sink, byte_count)) = accounted {
            sink(byte_count);
        }
        self.update_status(EntryStatus::BitmapGenerated);
    }

    /// Release the bitmap and the generator reference. Idempotent.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.bitmap = None;
        inner.generator = None;
    }
}
