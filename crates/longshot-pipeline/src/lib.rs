//! longshot-pipeline — long-form page capture and tiled compositing.
//!
//! Captures an entire scrollable page (far taller than one viewport) into
//! an opaque native buffer, then composites rectangular sub-regions of it
//! into bitmaps on demand:
//!
//! ```text
//! Coordinator ──► Generator::capture_tab() ──► (async) PaintService
//!      │                                             │
//!      │                     process_captured_tab(result)
//!      │                                             │
//!      │                             Compositor ──► ready / error
//!      ▼                                             │
//! queued Entries ◄────── flush on ready ◄────────────┘
//!      │
//!      └─► Entry::generate_bitmap() ─► Generator::composite_bitmap ─► Bitmap
//! ```
//!
//! Entries requested before the capture finishes are queued and flushed in
//! order on readiness; a session-level failure fans its terminal status out
//! to everything queued. Per-tile failures stay local to their entry.
//!
//! All async completions from the [`PaintService`](longshot_service::PaintService)
//! may land on a later turn of the event loop, arbitrarily interleaved with
//! new entry requests; nothing here assumes synchronous completion.

pub mod bounds;
pub mod compositor;
pub mod coordinator;
pub mod entry;
pub mod generator;

pub use bounds::BoundsManager;
pub use compositor::Compositor;
pub use coordinator::{Coordinator, SessionEvent, SessionStatus};
pub use entry::{Entry, EntryStatus};
pub use generator::{Generator, GeneratorEvent, GeneratorEventSink};

#[cfg(test)]
mod testing;
