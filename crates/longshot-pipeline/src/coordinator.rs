use std::sync::{Arc, Mutex, Weak};

use longshot_core::{CaptureConfig, Rect, ScrollOffset, Size};
use longshot_service::PaintService;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bounds::BoundsManager;
use crate::entry::{Entry, EntryStatus, MemorySink};
use crate::generator::{Generator, GeneratorEvent, GeneratorEventSink};

// ── Session status & events ───────────────────────────────────────────────────

/// Capture/session status, distinct from per-entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    CaptureInProgress,
    CaptureComplete,
    InsufficientMemory,
    GenerationError,
}

impl SessionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::InsufficientMemory | Self::GenerationError)
    }
}

/// Notifications delivered to session observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// Fired once, after `StatusChanged(CaptureComplete)`, with the page
    /// geometry the capture recorded.
    LayoutReady { content_size: Size, scroll_offset: ScrollOffset },
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// Top-level orchestrator: the single entry point for "start capturing this
/// page" and "give me a bitmap for this region".
///
/// Entries requested while the capture is still running are queued and
/// flushed in queue order once the compositor reports ready; a session
/// failure fans the matching terminal status out to everything queued.
pub struct Coordinator {
    weak:      Weak<Coordinator>,
    generator: Arc<Generator>,
    bounds:    Arc<Mutex<BoundsManager>>,
    inner:     Mutex<Inner>,
}

struct Inner {
    status:            SessionStatus,
    queued:            Vec<Arc<Entry>>,
    entries:           Vec<Arc<Entry>>,
    observers:         Vec<mpsc::UnboundedSender<SessionEvent>>,
    memory_used_bytes: u64,
    destroyed:         bool,
}

impl Coordinator {
    /// Start capturing `page_url` through `service`.
    ///
    /// The session status is `CaptureInProgress` before this returns,
    /// ahead of any async completion, so entries created before readiness
    /// are queued rather than processed early.
    pub fn new(
        service: Arc<dyn PaintService>,
        config: &CaptureConfig,
        page_url: impl Into<String>,
    ) -> Arc<Self> {
        let bounds = Arc::new(Mutex::new(BoundsManager::new(config)));
        let directory_key = Uuid::new_v4().to_string();

        let this = Arc::new_cyclic(|weak: &Weak<Self>| {
            let events: GeneratorEventSink = {
                let weak = weak.clone();
                Arc::new(move |event| {
                    if let Some(coordinator) = weak.upgrade() {
                        coordinator.on_generator_event(event);
                    }
                })
            };
            Self {
                weak: weak.clone(),
                generator: Generator::new(
                    service,
                    Arc::clone(&bounds),
                    page_url.into(),
                    directory_key,
                    events,
                ),
                bounds,
                inner: Mutex::new(Inner {
                    status: SessionStatus::CaptureInProgress,
                    queued: Vec::new(),
                    entries: Vec::new(),
                    observers: Vec::new(),
                    memory_used_bytes: 0,
                    destroyed: false,
                }),
            }
        });

        this.generator.capture_tab(config.in_memory);
        this
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.inner.lock().unwrap().status
    }

    /// Running total of bitmap memory handed out, in kilobytes. Eviction
    /// and backpressure are the caller's responsibility.
    pub fn memory_used_kb(&self) -> u64 {
        self.inner.lock().unwrap().memory_used_bytes / 1024
    }

    /// Page content size, once the capture has composited.
    pub fn content_size(&self) -> Option<Size> {
        self.generator.content_size()
    }

    /// Captured scroll position, once the capture has composited.
    pub fn scroll_offset(&self) -> Option<ScrollOffset> {
        self.generator.scroll_offset()
    }

    /// Create an entry for `bounds` and route it by session state: queued
    /// while capturing, generated immediately once complete, or stamped
    /// with the failure status the session already reached.
    pub fn generate_entry(&self, bounds: Rect) -> Arc<Entry> {
        let memory_sink: MemorySink = {
            let weak = self.weak.clone();
            Box::new(move |byte_count| {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.track_memory(byte_count);
                }
            })
        };
        let entry = Entry::new(bounds, Arc::clone(&self.generator), memory_sink);

        let mut inner = self.inner.lock().unwrap();
        inner.entries.push(Arc::clone(&entry));
        match inner.status {
            SessionStatus::CaptureInProgress => {
                entry.update_status(EntryStatus::Queued);
                inner.queued.push(Arc::clone(&entry));
            }
            SessionStatus::CaptureComplete => {
                drop(inner);
                entry.update_status(EntryStatus::CaptureComplete);
                entry.generate_bitmap();
            }
            SessionStatus::InsufficientMemory => {
                entry.update_status(EntryStatus::InsufficientMemory);
            }
            SessionStatus::GenerationError => {
                entry.update_status(EntryStatus::GenerationError);
            }
        }
        entry
    }

    /// Entry spanning the standard full-page window around the captured
    /// scroll offset.
    ///
    /// # Panics
    ///
    /// If the capture has not composited yet: the window is derived from
    /// content size and scroll offset, which do not exist earlier.
    pub fn generate_fullpage_entry(&self) -> Arc<Entry> {
        let bounds = self.bounds.lock().unwrap().full_entry_bounds();
        self.generate_entry(bounds)
    }

    /// Subscribe to session notifications. The current status (and the
    /// layout, if already known) is replayed into the channel before this
    /// returns, so late subscribers never miss the outcome. Dropping the
    /// receiver unsubscribes.
    pub fn add_observer(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let layout = {
            let bounds = self.bounds.lock().unwrap();
            bounds.content_size().zip(bounds.scroll_offset())
        };

        let mut inner = self.inner.lock().unwrap();
        let _ = tx.send(SessionEvent::StatusChanged(inner.status));
        if inner.status == SessionStatus::CaptureComplete {
            if let Some((content_size, scroll_offset)) = layout {
                let _ = tx.send(SessionEvent::LayoutReady { content_size, scroll_offset });
            }
        }
        inner.observers.push(tx);
        rx
    }

    /// Tear down every entry, then the generator (which cascades to the
    /// compositor and the native session). Idempotent.
    pub fn destroy(&self) {
        let entries = {
            let mut inner = self.inner.lock().unwrap();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            inner.queued.clear();
            inner.observers.clear();
            std::mem::take(&mut inner.entries)
        };
        for entry in &entries {
            entry.destroy();
        }
        self.generator.destroy();
    }

    // ── Generator completions ─────────────────────────────────────────────

    fn on_generator_event(&self, event: GeneratorEvent) {
        match event {
            GeneratorEvent::CompositorReady { content_size, scroll_offset } => {
                self.on_ready(content_size, scroll_offset);
            }
            GeneratorEvent::CaptureFailed(status) => {
                self.fail_session(if status.is_memory_pressure() {
                    SessionStatus::InsufficientMemory
                } else {
                    SessionStatus::GenerationError
                });
            }
            GeneratorEvent::CompositorFailed(status) => {
                self.fail_session(if status.is_memory_pressure() {
                    SessionStatus::InsufficientMemory
                } else {
                    SessionStatus::GenerationError
                });
            }
        }
    }

    fn on_ready(&self, content_size: Size, scroll_offset: ScrollOffset) {
        info!("capture composited: content {content_size}, scroll {scroll_offset}");
        {
            let mut bounds = self.bounds.lock().unwrap();
            bounds.set_content_size(content_size);
            bounds.set_scroll_offset(scroll_offset);
        }

        let flushed = {
            let mut inner = self.inner.lock().unwrap();
            if inner.destroyed {
                return;
            }
            inner.status = SessionStatus::CaptureComplete;
            Self::broadcast(
                &mut inner.observers,
                SessionEvent::StatusChanged(SessionStatus::CaptureComplete),
            );
            Self::broadcast(
                &mut inner.observers,
                SessionEvent::LayoutReady { content_size, scroll_offset },
            );
            std::mem::take(&mut inner.queued)
        };

        // Flush in the order queued; completions may still land in any order.
        for entry in flushed {
            entry.update_status(EntryStatus::CaptureComplete);
            entry.generate_bitmap();
        }
    }

    fn fail_session(&self, status: SessionStatus) {
        warn!("session failed: {status:?}");
        let abandoned = {
            let mut inner = self.inner.lock().unwrap();
            if inner.destroyed {
                return;
            }
            inner.status = status;
            Self::broadcast(&mut inner.observers, SessionEvent::StatusChanged(status));
            std::mem::take(&mut inner.queued)
        };

        let entry_status = if status == SessionStatus::InsufficientMemory {
            EntryStatus::InsufficientMemory
        } else {
            EntryStatus::GenerationError
        };
        for entry in abandoned {
            entry.update_status(entry_status);
        }
    }

    fn broadcast(observers: &mut Vec<mpsc::UnboundedSender<SessionEvent>>, event: SessionEvent) {
        observers.retain(|tx| tx.send(event).is_ok());
    }

    fn track_memory(&self, byte_count: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.memory_used_bytes += byte_count as u64;
        debug!(
            "tile bitmap of {} bytes recorded, session total {} KiB",
            byte_count,
            inner.memory_used_bytes / 1024
        );
    }
}
