use anyhow::{Context, Result};
use icsmirror_core::GitPublisher;
use icsmirror_core::ingest::{self, IngestReport};
use icsmirror_core::publish::publish_best_effort;

use crate::config::Config;
use crate::feed::HttpFeed;

use super::state_dir;

pub async fn run(cfg: &Config, publish: bool) -> Result<IngestReport> {
    let state = state_dir(cfg);
    let feed = HttpFeed::new(cfg.fetch_url());

    println!("📥 Ingesting: {}", cfg.feed_url);

    let report = ingest::ingest(&feed, &state)
        .await
        .with_context(|| format!("Failed to ingest {}", cfg.feed_url))?;

    println!("  Fetched {} events", report.fetched);
    for record in &report.added {
        println!("    + {} ({})", record.summary, record.start.to_rfc3339());
    }
    println!(
        "  {} new, {} stored, rendered to {}",
        report.added.len(),
        report.total,
        state.full_feed_path().display()
    );

    if publish || cfg.publish.enabled {
        let publisher = GitPublisher::new(cfg.publish.remote.clone(), cfg.publish.message.clone());
        if publish_best_effort(&publisher, &state.full_feed_path()).await {
            println!("  Published {}", state.full_feed_path().display());
        } else {
            println!("  Publishing skipped (see log)");
        }
    }

    Ok(report)
}
