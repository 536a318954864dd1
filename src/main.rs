mod commands;
mod config;
mod feed;
mod google;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "icsmirror")]
#[command(about = "Archive a remote ICS feed and mirror its events into Google calendars")]
struct Cli {
    /// Config file (defaults to ~/.config/icsmirror/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level and list events in summaries
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the feed, then mirror new events to every destination
    Sync {
        /// Commit and push the rendered feed after ingesting
        #[arg(long)]
        publish: bool,
    },
    /// Fetch the feed, merge it into the store and render full.ics
    Ingest {
        /// Commit and push the rendered feed after ingesting
        #[arg(long)]
        publish: bool,
    },
    /// Mirror stored events to every destination
    Mirror,
    /// Show how many stored events each destination is missing
    Status,
    /// Authenticate with Google Calendar
    Auth,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose);

    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync { publish } => commands::sync::run(&cfg, publish).await,
        Commands::Ingest { publish } => commands::ingest::run(&cfg, publish).await.map(|_| ()),
        Commands::Mirror => commands::mirror::run(&cfg).await,
        Commands::Status => commands::status::run(&cfg, cli.verbose),
        Commands::Auth => commands::auth::run(&cfg).await,
    }
}
