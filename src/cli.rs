//! Command-line interface definitions.
//!
//! Each source has a subcommand that runs a single scrape. `batch` runs the
//! jobs listed in a YAML file. Transport options are global and can also be set
//! through `NEWS_SCRAPERS_*` environment variables.

use crate::config::{
    CNN_API_URL, CNN_ITEMS_PER_PAGE, FOX_API_URL, FOX_ITEMS_PER_PAGE, FOX_SITE_URL, HttpSettings,
    Job, RIA_BASE_URL, SourceConfig,
};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # CNN articles about Ukraine since the start of 2024, zipped
/// news_scrapers cnn -q ukraine --min-date 2024-01-01 -o out/cnn.csv.zip
///
/// # A RIA rubric as plain CSV, at most 20 pages
/// news_scrapers ria --start-url https://ria.ru/politics/ --min-date 2024-01-01 \
///     -o out/ria.csv --no-zip --max-pages 20
///
/// # Everything in a batch file
/// news_scrapers batch -c jobs.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub http: HttpArgs,
}

#[derive(Args, Debug)]
pub struct HttpArgs {
    /// Retries per request on timeouts, 429 and 5xx responses
    #[arg(long, env = "NEWS_SCRAPERS_MAX_RETRIES", default_value_t = 3, global = true)]
    pub max_retries: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "NEWS_SCRAPERS_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Article bodies fetched at once
    #[arg(long, env = "NEWS_SCRAPERS_CONCURRENCY", default_value_t = 4, global = true)]
    pub concurrency: usize,

    /// User-Agent header sent with every request
    #[arg(long, env = "NEWS_SCRAPERS_USER_AGENT", global = true)]
    pub user_agent: Option<String>,
}

impl HttpArgs {
    pub fn settings(&self) -> HttpSettings {
        let defaults = HttpSettings::default();
        HttpSettings {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            concurrency: self.concurrency,
            ..defaults
        }
    }
}

/// Options shared by every single-source subcommand.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Earliest publish date to keep: YYYY-MM-DD, "YYYY-MM-DD HH:MM:SS" or RFC 3339
    #[arg(long)]
    pub min_date: String,

    /// Output file for the CSV table
    #[arg(short, long)]
    pub output: String,

    /// Write plain CSV instead of a zip archive
    #[arg(long)]
    pub no_zip: bool,

    /// Also dump the raw API pages to this JSON file
    #[arg(long)]
    pub raw_output: Option<String>,

    /// Stop after this many listing pages
    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape a RIA Novosti rubric page and its "load more" pages
    Ria {
        /// Rubric page to start from, e.g. https://ria.ru/politics/
        #[arg(long)]
        start_url: String,

        /// Base that relative "load more" URLs are resolved against
        #[arg(long, default_value = RIA_BASE_URL)]
        base_url: String,

        #[command(flatten)]
        job: JobArgs,
    },
    /// Query the CNN search API
    Cnn {
        /// Search query
        #[arg(short, long)]
        query: String,

        #[arg(long, default_value_t = CNN_ITEMS_PER_PAGE)]
        items_per_page: usize,

        #[arg(long, default_value = CNN_API_URL)]
        api_url: String,

        #[command(flatten)]
        job: JobArgs,
    },
    /// Query the Fox News tag search API
    Fox {
        /// Tag to search for
        #[arg(short, long)]
        query: String,

        #[arg(long, default_value_t = FOX_ITEMS_PER_PAGE)]
        items_per_page: usize,

        #[arg(long, default_value = FOX_API_URL)]
        api_url: String,

        /// Site that relative article URLs are appended to
        #[arg(long, default_value = FOX_SITE_URL)]
        site_url: String,

        #[command(flatten)]
        job: JobArgs,
    },
    /// Run every job listed in a YAML file
    Batch {
        /// Path to the batch YAML file
        #[arg(short, long, env = "NEWS_SCRAPERS_CONFIG")]
        config: String,
    },
}

impl Command {
    /// The job a single-source subcommand describes; `None` for `batch`.
    pub fn into_job(self) -> Option<Job> {
        let (source, job) = match self {
            Command::Ria {
                start_url,
                base_url,
                job,
            } => (SourceConfig::Ria { start_url, base_url }, job),
            Command::Cnn {
                query,
                items_per_page,
                api_url,
                job,
            } => (
                SourceConfig::Cnn {
                    query,
                    items_per_page,
                    api_url,
                },
                job,
            ),
            Command::Fox {
                query,
                items_per_page,
                api_url,
                site_url,
                job,
            } => (
                SourceConfig::Fox {
                    query,
                    items_per_page,
                    api_url,
                    site_url,
                },
                job,
            ),
            Command::Batch { .. } => return None,
        };
        Some(Job {
            source,
            min_date: job.min_date,
            output: job.output,
            zipped: !job.no_zip,
            raw_output: job.raw_output,
            max_pages: job.max_pages,
        })
    }
}
