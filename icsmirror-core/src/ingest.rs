//! The ingestion pass: fetch, decode, merge, render.

use crate::error::IcsMirrorResult;
use crate::feed::FeedSource;
use crate::ics;
use crate::record::EventRecord;
use crate::state::{StateDir, write_atomic};
use crate::store::EventStore;

/// What an ingestion pass did.
#[derive(Debug)]
pub struct IngestReport {
    /// Events found in the fetched feed
    pub fetched: usize,
    /// Events new to the store, in feed order
    pub added: Vec<EventRecord>,
    /// Store size after the merge
    pub total: usize,
}

/// Fetch the feed, merge it into the store and re-render the full feed.
///
/// Fetch and decode failures abort before the store is touched.
pub async fn ingest<F: FeedSource>(feed: &F, state: &StateDir) -> IcsMirrorResult<IngestReport> {
    let bytes = feed.fetch().await?;
    log::info!("Fetched {} bytes", bytes.len());
    write_atomic(&state.latest_feed_path(), &bytes)?;

    let incoming = ics::parse_feed(&bytes)?;
    let fetched = incoming.len();

    let mut store = EventStore::load(state.events_path())?;
    let added = store.merge(incoming);
    store.save()?;
    log::info!(
        "Added {} new event(s), {} stored",
        added.len(),
        store.len()
    );

    render(&store, state)?;

    Ok(IngestReport {
        fetched,
        added,
        total: store.len(),
    })
}

/// Write the store out as the full feed.
pub fn render(store: &EventStore, state: &StateDir) -> IcsMirrorResult<()> {
    let path = state.full_feed_path();
    write_atomic(&path, &ics::render_feed(store.records()))?;
    log::info!("Rendered {} event(s) to {}", store.len(), path.display());
    Ok(())
}
