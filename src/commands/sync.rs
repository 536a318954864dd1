use anyhow::Result;

use crate::config::Config;

/// Ingest the feed, then mirror whatever is new.
pub async fn run(cfg: &Config, publish: bool) -> Result<()> {
    super::ingest::run(cfg, publish).await?;
    super::mirror::run(cfg).await
}
