use anyhow::{Context, Result};
use icsmirror_core::state::progress_file_name;
use icsmirror_core::{Category, CategoryRules, Destination, KeywordRule, OverrideRule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Remote ICS feed to archive (http, https or webcal)
    pub feed_url: String,

    /// Where the store, rendered feed and progress files live
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Pause after each successful push, to stay under API rate limits
    #[serde(default = "default_push_delay_ms")]
    pub push_delay_ms: u64,

    /// OAuth client for Google Calendar
    #[serde(default)]
    pub google: Option<GoogleConfig>,

    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,

    #[serde(default)]
    pub categories: CategoriesConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

/// OAuth credentials for Google Calendar
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    pub name: String,
    pub calendar_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesConfig {
    /// keyword -> category
    #[serde(default = "default_keywords")]
    pub keywords: BTreeMap<String, String>,

    #[serde(default = "default_overrides")]
    pub overrides: Vec<OverrideConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideConfig {
    pub all_of: Vec<String>,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub remote: Option<String>,

    #[serde(default = "default_publish_message")]
    pub message: String,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        CategoriesConfig {
            keywords: default_keywords(),
            overrides: default_overrides(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            enabled: false,
            remote: None,
            message: default_publish_message(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("icsmirror").to_string_lossy().to_string())
        .unwrap_or_else(|| "~/icsmirror".to_string())
}

fn default_push_delay_ms() -> u64 {
    300
}

fn default_publish_message() -> String {
    "Update full.ics".to_string()
}

fn default_keywords() -> BTreeMap<String, String> {
    [
        ("lecture", "2"),
        ("lab", "5"),
        ("exam", "7"),
        ("discussion", "3"),
        ("anatomy", "5"),
        ("required", "4"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_overrides() -> Vec<OverrideConfig> {
    vec![OverrideConfig {
        all_of: vec!["anatomy".to_string(), "quiz".to_string()],
        category: "11".to_string(),
    }]
}

impl Config {
    /// Parse and validate a config from TOML text
    pub fn from_toml(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.feed_url)
            .with_context(|| format!("Invalid feed_url '{}'", self.feed_url))?;
        if !matches!(url.scheme(), "http" | "https" | "webcal") {
            anyhow::bail!(
                "feed_url must use http, https or webcal (got '{}://')",
                url.scheme()
            );
        }

        let mut seen = HashSet::new();
        for destination in &self.destinations {
            let name = destination.name.trim();
            if name.is_empty() {
                anyhow::bail!("Destination names cannot be empty");
            }
            if destination.calendar_id.trim().is_empty() {
                anyhow::bail!("Destination '{}' has no calendar_id", name);
            }
            // Progress files are named by slug, so slugs must not collide
            if !seen.insert(progress_file_name(name)) {
                anyhow::bail!("Destination '{}' is defined more than once", name);
            }
        }

        Ok(())
    }

    /// URL to download, with webcal:// mapped to https://
    pub fn fetch_url(&self) -> String {
        match self.feed_url.strip_prefix("webcal://") {
            Some(rest) => format!("https://{}", rest),
            None => self.feed_url.clone(),
        }
    }

    pub fn data_path(&self) -> PathBuf {
        resolve_home(&self.data_dir)
    }

    pub fn push_delay(&self) -> Duration {
        Duration::from_millis(self.push_delay_ms)
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations
            .iter()
            .map(|d| Destination {
                name: d.name.trim().to_string(),
                calendar_id: d.calendar_id.trim().to_string(),
            })
            .collect()
    }

    pub fn category_rules(&self) -> CategoryRules {
        CategoryRules {
            keywords: self
                .categories
                .keywords
                .iter()
                .map(|(keyword, category)| KeywordRule {
                    keyword: keyword.clone(),
                    category: Category::new(category.clone()),
                })
                .collect(),
            overrides: self
                .categories
                .overrides
                .iter()
                .map(|o| OverrideRule {
                    all_of: o.all_of.clone(),
                    category: Category::new(o.category.clone()),
                })
                .collect(),
        }
    }
}

/// OAuth tokens for the Google account events are written with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `<config_dir>/icsmirror`, home of config.toml and tokens.json
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("icsmirror"))
        .context("No config directory on this platform")
}

pub fn default_config_path() -> Result<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

pub fn tokens_path() -> Result<PathBuf> {
    config_dir().map(|dir| dir.join("tokens.json"))
}

/// Load config from `path`, or ~/.config/icsmirror/config.toml
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        anyhow::bail!(
            "Config file not found at {}\n\n\
            Create it with at least the feed to archive:\n\n\
            feed_url = \"https://example.edu/calendar.ics\"\n\n\
            [google]\n\
            client_id = \"your-client-id.apps.googleusercontent.com\"\n\
            client_secret = \"your-client-secret\"\n\n\
            [[destinations]]\n\
            name = \"personal\"\n\
            calendar_id = \"...@group.calendar.google.com\"",
            path.display()
        );
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    Config::from_toml(&contents)
        .with_context(|| format!("Failed to load config file at {}", path.display()))
}

/// Stored Google tokens, or `None` before `icsmirror auth` has run.
pub fn read_tokens() -> Result<Option<AccountTokens>> {
    let path = tokens_path()?;
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Cannot read {}", path.display()));
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .with_context(|| format!("{} is not a valid token file", path.display()))
}

pub fn write_tokens(tokens: &AccountTokens) -> Result<()> {
    let path = tokens_path()?;
    let dir = path.parent().context("Token path has no parent directory")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create {}", dir.display()))?;

    let json = serde_json::to_vec_pretty(tokens)?;
    std::fs::write(&path, json).with_context(|| format!("Cannot write {}", path.display()))
}

/// Resolve a leading `~/` against the home directory.
pub fn resolve_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
