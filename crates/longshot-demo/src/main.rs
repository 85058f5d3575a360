//! End-to-end run of the longshot pipeline against the synthetic page
//! service: capture → composite → full-page tile → neighbour tiles.

mod synthetic;

use std::sync::Arc;

use anyhow::Result;
use longshot_core::{CaptureConfig, Rect, ScrollOffset, Size};
use longshot_pipeline::{Coordinator, Entry, EntryStatus, SessionEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    // A 360×4000 px synthetic article, scrolled most of the way down.
    let config = CaptureConfig {
        viewport_width_px: 360,
        viewport_height_px: 800,
        ..Default::default()
    };
    let service = Arc::new(synthetic::SyntheticPaintService::new(
        Size::new(360, 4_000),
        ScrollOffset::new(0, 2_400),
    ));

    let coordinator = Coordinator::new(service, &config, "https://example.com/article");
    let mut events = coordinator.add_observer();

    // Tile requested before the capture finishes — exercises the queue.
    let early = coordinator.generate_entry(Rect::vertical_span(0, 800));
    info!("tile {} requested while still capturing: {:?}", early.id(), early.status());

    // ── Wait for the capture to composite ─────────────────────────────────
    loop {
        match events.recv().await {
            Some(SessionEvent::LayoutReady { content_size, scroll_offset }) => {
                info!("page composited: content {content_size}, scroll {scroll_offset}");
                break;
            }
            Some(SessionEvent::StatusChanged(status)) if status.is_failure() => {
                anyhow::bail!("session failed: {status:?}");
            }
            Some(SessionEvent::StatusChanged(status)) => {
                info!("session status: {status:?}");
            }
            None => anyhow::bail!("coordinator went away"),
        }
    }

    // ── Full-page tile around the scroll offset ───────────────────────────
    let fullpage = coordinator.generate_fullpage_entry();
    info!("full-page tile {} covers {}", fullpage.id(), fullpage.bounds().unwrap());

    for entry in [&early, &fullpage] {
        match wait_terminal(entry).await? {
            EntryStatus::BitmapGenerated => {
                let bitmap = entry.bitmap().expect("generated tiles carry a bitmap");
                info!(
                    "tile {}: {}×{} px, {} KiB",
                    entry.id(),
                    bitmap.width(),
                    bitmap.height(),
                    bitmap.byte_count() / 1024
                );
            }
            status => anyhow::bail!("tile {} ended in {status:?}", entry.id()),
        }
    }

    info!("session bitmap memory: {} KiB", coordinator.memory_used_kb());
    coordinator.destroy();
    Ok(())
}

async fn wait_terminal(entry: &Arc<Entry>) -> Result<EntryStatus> {
    let mut rx = entry.watch_status();
    loop {
        let status = *rx.borrow_and_update();
        if status.is_terminal() {
            return Ok(status);
        }
        rx.changed().await?;
    }
}
