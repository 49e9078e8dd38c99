use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::fetch::DEFAULT_USER_AGENT;

const DEFAULT_CONFIG_FILE: &str = "enricher";

/// Defaults, then `enricher.toml` (or an explicit file), then `ENRICH_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub items_path: PathBuf,
    pub progress_path: PathBuf,
    pub review_path: PathBuf,
    pub batch_size: usize,
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    pub checkpoint: bool,
    pub checkpoint_push: bool,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("items_path", "src/data/items.json")?
            .set_default("progress_path", "scrape-progress.json")?
            .set_default("review_path", "urls-to-review.json")?
            .set_default("batch_size", 50_i64)?
            .set_default("delay_ms", 1000_i64)?
            .set_default("timeout_secs", 10_i64)?
            .set_default("max_redirects", 10_i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("checkpoint", false)?
            .set_default("checkpoint_push", false)?;

        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder
            .add_source(Environment::with_prefix("ENRICH"))
            .build()?
            .try_deserialize()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
