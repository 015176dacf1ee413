//! Job and HTTP configuration.
//!
//! A [`Job`] describes one scrape: which source, how far back, and where the
//! table goes. Jobs come either from a CLI subcommand or from a YAML batch
//! file:
//!
//! ```yaml
//! jobs:
//!   - source: cnn
//!     query: ukraine
//!     min_date: "2024-01-01"
//!     output: out/cnn.csv.zip
//!   - source: ria
//!     start_url: https://ria.ru/politics/
//!     min_date: "2024-01-01"
//!     output: out/ria.csv
//!     zipped: false
//! ```

use crate::cutoff::MinDate;
use crate::errors::{ScrapeError, ScrapeResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const RIA_BASE_URL: &str = "https://ria.ru";
pub const CNN_API_URL: &str = "https://search.api.cnn.com/content?sort=newest&types=article";
pub const CNN_ITEMS_PER_PAGE: usize = 50;
pub const FOX_API_URL: &str =
    "https://www.foxnews.com/api/article-search?searchBy=tags&excludeBy=tags&excludeValues=";
pub const FOX_SITE_URL: &str = "https://foxnews.com";
pub const FOX_ITEMS_PER_PAGE: usize = 30;

/// Transport settings shared by every scraper in a run.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
    /// How many article bodies are fetched at once.
    pub concurrency: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
            concurrency: 4,
        }
    }
}

fn default_ria_base() -> String {
    RIA_BASE_URL.to_string()
}
fn default_cnn_api() -> String {
    CNN_API_URL.to_string()
}
fn default_cnn_size() -> usize {
    CNN_ITEMS_PER_PAGE
}
fn default_fox_api() -> String {
    FOX_API_URL.to_string()
}
fn default_fox_site() -> String {
    FOX_SITE_URL.to_string()
}
fn default_fox_size() -> usize {
    FOX_ITEMS_PER_PAGE
}
fn default_zipped() -> bool {
    true
}

/// Source-specific settings, tagged by `source` in YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SourceConfig {
    Ria {
        start_url: String,
        #[serde(default = "default_ria_base")]
        base_url: String,
    },
    Cnn {
        query: String,
        #[serde(default = "default_cnn_size")]
        items_per_page: usize,
        #[serde(default = "default_cnn_api")]
        api_url: String,
    },
    Fox {
        query: String,
        #[serde(default = "default_fox_size")]
        items_per_page: usize,
        #[serde(default = "default_fox_api")]
        api_url: String,
        #[serde(default = "default_fox_site")]
        site_url: String,
    },
}

impl SourceConfig {
    pub fn name(&self) -> &'static str {
        match self {
            SourceConfig::Ria { .. } => "ria",
            SourceConfig::Cnn { .. } => "cnn",
            SourceConfig::Fox { .. } => "fox",
        }
    }
}

/// One scrape and its export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    #[serde(flatten)]
    pub source: SourceConfig,
    pub min_date: String,
    pub output: String,
    #[serde(default = "default_zipped")]
    pub zipped: bool,
    /// Where to dump the raw API pages, if anywhere.
    #[serde(default)]
    pub raw_output: Option<String>,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

impl Job {
    pub fn min_date(&self) -> ScrapeResult<MinDate> {
        self.min_date.parse()
    }

    /// Reject settings that would make a scraper loop forever or never start.
    pub fn validate(&self) -> ScrapeResult<()> {
        self.min_date()?;
        match &self.source {
            SourceConfig::Cnn { items_per_page, .. } | SourceConfig::Fox { items_per_page, .. }
                if *items_per_page == 0 =>
            {
                Err(ScrapeError::Config("items_per_page must be positive".to_string()))
            }
            _ if self.max_pages == Some(0) => {
                Err(ScrapeError::Config("max_pages must be positive".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchConfig {
    pub jobs: Vec<Job>,
}

impl BatchConfig {
    pub fn from_yaml(text: &str) -> ScrapeResult<Self> {
        serde_yaml::from_str(text).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> ScrapeResult<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml(&text)?;
        info!(jobs = config.jobs.len(), "Loaded batch config");
        Ok(config)
    }
}
