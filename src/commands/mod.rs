pub mod auth;
pub mod ingest;
pub mod mirror;
pub mod status;
pub mod sync;

use anyhow::Result;
use icsmirror_core::StateDir;

use crate::config::Config;

/// The data directory described by the config
pub fn state_dir(cfg: &Config) -> StateDir {
    StateDir::new(cfg.data_path())
}

/// Shared error message for empty destination config
pub fn require_destinations(cfg: &Config) -> Result<()> {
    if cfg.destinations.is_empty() {
        anyhow::bail!(
            "No destinations configured.\n\
            Add at least one [[destinations]] entry to config.toml"
        );
    }
    Ok(())
}
