//! # News Scrapers
//!
//! Pages through news sites and search APIs back to a cutoff date and exports
//! every article as one uniform row: `url, timestamp, headline, body`.
//!
//! ## Features
//!
//! - RIA Novosti rubric listings (HTML "load more" pagination)
//! - CNN search API (bodies included in the response)
//! - Fox News tag search API (bodies from each page's JSON-LD)
//! - Cutoff dates aligned to each source's timezone
//! - Retries with exponential backoff on transient HTTP failures
//! - CSV export, zipped by default, plus an optional raw JSON dump
//!
//! ## Usage
//!
//! ```sh
//! news_scrapers cnn -q ukraine --min-date 2024-01-01 -o out/cnn.csv.zip
//! news_scrapers batch -c jobs.yaml
//! ```
//!
//! ## Architecture
//!
//! Every job runs the same pipeline:
//! 1. **Validate**: parse the cutoff date and check the output directory
//! 2. **Scrape**: the source's scraper pages until the cutoff is reached
//! 3. **Export**: write the CSV table (and the raw pages, if asked)

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod cutoff;
mod errors;
mod http;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::{BatchConfig, HttpSettings, Job};
use errors::ScrapeResult;
use http::{Fetcher, build_fetcher};
use outputs::{csv, json};
use scrapers::{NewsScraper, Scraper};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("news_scrapers starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = args.http.settings();
    let fetcher = build_fetcher(&settings)?;

    let jobs = match args.command {
        Command::Batch { config } => BatchConfig::load(&config).await?.jobs,
        command => command.into_job().into_iter().collect(),
    };
    info!(jobs = jobs.len(), "Jobs to run");

    let failed = run_jobs(&jobs, &fetcher, &settings).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        total = jobs.len(),
        failed,
        "Execution complete"
    );

    if failed > 0 {
        return Err(format!("{failed} of {} jobs failed", jobs.len()).into());
    }
    Ok(())
}

/// Run every job in order and return how many failed.
///
/// A failed job is logged and does not stop the jobs after it.
async fn run_jobs(jobs: &[Job], fetcher: &Fetcher, settings: &HttpSettings) -> usize {
    let mut failed = 0usize;
    for job in jobs {
        if let Err(e) = run_job(job, fetcher.clone(), settings).await {
            error!(source = job.source.name(), output = %job.output, error = %e, "Job failed");
            failed += 1;
        }
    }
    failed
}

/// Scrape one source and export the result.
#[instrument(level = "info", skip_all, fields(source = job.source.name(), output = %job.output))]
async fn run_job(job: &Job, fetcher: Fetcher, settings: &HttpSettings) -> ScrapeResult<()> {
    let scraper = Scraper::from_job(job, fetcher, settings)?;

    // Fail before scraping rather than after.
    ensure_writable_dir(&job.output).await?;
    if let Some(raw_output) = &job.raw_output {
        ensure_writable_dir(raw_output).await?;
    }

    let t0 = Instant::now();
    info!(cutoff = %scraper.cutoff(), "Scraping");
    let out = scraper.scrape().await?;
    info!(
        pages = out.pages,
        articles = out.articles.len(),
        oldest = ?out.oldest().map(|t| t.to_rfc3339()),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Scrape finished"
    );

    csv::write_table(&out.articles, &job.output, job.zipped).await?;
    if let Some(raw_output) = &job.raw_output {
        json::write_source_data(&out.source_data, raw_output).await?;
    }
    Ok(())
}
