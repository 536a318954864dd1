use anyhow::{Context, Result};
use icsmirror_core::{EventStore, ProgressSet};

use crate::config::Config;

use super::{require_destinations, state_dir};

pub fn run(cfg: &Config, verbose: bool) -> Result<()> {
    require_destinations(cfg)?;

    let state = state_dir(cfg);
    let store = EventStore::load(state.events_path()).context("Failed to load stored events")?;

    println!("📅 {} stored events in {}", store.len(), state.root().display());

    let mut any_pending = false;

    for destination in cfg.destinations() {
        let progress = ProgressSet::load(state.progress_path(&destination.name))
            .with_context(|| format!("Failed to load progress for '{}'", destination.name))?;
        let pending: Vec<_> = progress.pending(store.records()).collect();

        println!(
            "\n  {}: {} mirrored, {} to push",
            destination.name,
            progress.len(),
            pending.len()
        );

        if verbose {
            for record in &pending {
                println!("    + {} ({})", record.summary, record.start.to_rfc3339());
            }
        }

        any_pending |= !pending.is_empty();
    }

    if any_pending {
        println!("\nRun `icsmirror mirror` to push pending events.");
    } else {
        println!("\nEverything up to date.");
    }

    Ok(())
}
