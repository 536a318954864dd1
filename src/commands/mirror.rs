use anyhow::{Context, Result};
use icsmirror_core::{Categorizer, EventStore, MirrorDriver};

use crate::config::Config;
use crate::google::GoogleCalendar;

use super::{require_destinations, state_dir};

pub async fn run(cfg: &Config) -> Result<()> {
    require_destinations(cfg)?;

    let google = cfg.google.as_ref().ok_or_else(|| {
        anyhow::anyhow!(
            "No [google] section in config.toml.\n\
            Add client_id and client_secret, then run `icsmirror auth`"
        )
    })?;

    let state = state_dir(cfg);
    let store = EventStore::load(state.events_path()).context("Failed to load stored events")?;
    if store.is_empty() {
        println!("No stored events to mirror. Run `icsmirror ingest` first.");
        return Ok(());
    }

    let service = GoogleCalendar::connect(google).await?;
    let categorizer = Categorizer::new(cfg.category_rules());
    let driver = MirrorDriver::new(&service, &categorizer, cfg.push_delay());

    let reports = driver
        .run(&cfg.destinations(), store.records(), &state)
        .await
        .context("Failed to save mirroring progress")?;

    let mut total_added = 0;
    let mut total_failed = 0;

    for report in &reports {
        println!("\n📤 Mirroring: {}", report.destination);
        println!(
            "  {} added, {} skipped, {} failed",
            report.added,
            report.skipped,
            report.failed()
        );
        for failure in &report.failures {
            println!("    ! {}: {}", failure.key, failure.error);
        }
        total_added += report.added;
        total_failed += report.failed();
    }

    if total_failed > 0 {
        println!(
            "\nMirrored {} events, {} failed (they will be retried next run).",
            total_added, total_failed
        );
    } else if total_added > 0 {
        println!("\nMirrored {} events.", total_added);
    } else {
        println!("\nEverything up to date.");
    }

    Ok(())
}
