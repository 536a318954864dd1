use anyhow::Result;

use crate::config::{self, Config};
use crate::google;

pub async fn run(cfg: &Config) -> Result<()> {
    let google_config = cfg.google.as_ref().ok_or_else(|| {
        anyhow::anyhow!(
            "No [google] section in config.toml.\n\
            Add your OAuth client first:\n\n\
            [google]\n\
            client_id = \"your-client-id.apps.googleusercontent.com\"\n\
            client_secret = \"your-client-secret\""
        )
    })?;

    println!("Authenticating with Google...");

    let tokens = google::authorize(google_config).await?;
    config::write_tokens(&tokens)?;

    println!("\nAuthenticated. Tokens saved to {}", config::tokens_path()?.display());
    println!("\nNow add a destination to your config.toml:");
    println!();
    println!("[[destinations]]");
    println!("name = \"personal\"");
    println!("calendar_id = \"primary\"");
    println!();
    println!("Then run `icsmirror sync` to mirror your feed.");

    Ok(())
}
