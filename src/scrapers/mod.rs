//! News source scrapers.
//!
//! Each scraper pages through one source until the cutoff date is reached and
//! returns the accumulated table. The loop is the same straight line for every
//! source:
//!
//! 1. **Listing**: fetch one page of entries (HTML listing or JSON search API)
//! 2. **Bodies**: fetch article bodies for the entries that pass the cutoff
//! 3. **Accumulate**: append the page to the [`ScrapeOutput`]
//! 4. **Stop check**: stop once a page has nothing newer than the cutoff
//!
//! # Supported Sources
//!
//! | Source | Module | Listing | Body | Cutoff timezone |
//! |--------|--------|---------|------|-----------------|
//! | RIA Novosti | [`ria`] | "load more" HTML fragments | article HTML blocks | Moscow |
//! | CNN | [`cnn`] | search API | included in the API | UTC |
//! | Fox News | [`fox`] | search API | JSON-LD on the article page | UTC |

use crate::config::{HttpSettings, Job, SourceConfig};
use crate::cutoff::Cutoff;
use crate::errors::ScrapeResult;
use crate::http::Fetcher;
use crate::models::{ScrapeOutput, ScrapedArticle};
use chrono::{DateTime, FixedOffset};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, error};

pub mod cnn;
pub mod fox;
pub mod ria;

pub use cnn::CnnScraper;
pub use fox::FoxScraper;
pub use ria::RiaScraper;

/// A paginating scraper for one news source.
pub trait NewsScraper {
    /// Short tag used in logs and default file names.
    fn name(&self) -> &'static str;

    /// The instant below which entries are discarded and paging stops.
    fn cutoff(&self) -> Cutoff;

    /// Run the pagination loop to completion.
    async fn scrape(&self) -> ScrapeResult<ScrapeOutput>;
}

/// Options every scraper shares, whatever the source.
#[derive(Debug, Clone)]
pub struct PagingOptions {
    pub max_pages: Option<usize>,
    pub concurrency: usize,
}

impl PagingOptions {
    pub fn new(max_pages: Option<usize>, settings: &HttpSettings) -> Self {
        Self {
            max_pages,
            concurrency: settings.concurrency.max(1),
        }
    }

    /// Whether `pages` listing pages already exhaust the page budget.
    pub fn exhausted(&self, pages: usize) -> bool {
        self.max_pages.is_some_and(|max| pages >= max)
    }
}

/// A listing entry before its body is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub url: String,
    pub timestamp: DateTime<FixedOffset>,
    pub headline: String,
}

impl ListingEntry {
    pub fn with_body(self, body: String) -> ScrapedArticle {
        ScrapedArticle {
            url: self.url,
            timestamp: self.timestamp,
            headline: self.headline,
            body,
        }
    }
}

/// Fetch bodies for `entries`, `concurrency` at a time, keeping listing order.
///
/// Entries whose body fetch fails are logged and left out.
pub(crate) async fn fetch_bodies<F, Fut>(
    source: &str,
    entries: Vec<ListingEntry>,
    concurrency: usize,
    fetch_body: F,
) -> Vec<ScrapedArticle>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = ScrapeResult<String>>,
{
    stream::iter(entries)
        .map(|entry| {
            let body = fetch_body(entry.url.clone());
            async move { (entry, body.await) }
        })
        .buffered(concurrency.max(1))
        .filter_map(|(entry, body)| async move {
            match body {
                Ok(body) => {
                    debug!(%source, url = %entry.url, bytes = body.len(), "Fetched article body");
                    Some(entry.with_body(body))
                }
                Err(e) => {
                    error!(%source, url = %entry.url, error = %e, "Article fetch failed; skipping");
                    None
                }
            }
        })
        .collect()
        .await
}

/// Any of the supported scrapers, chosen from a [`Job`].
#[derive(Debug)]
pub enum Scraper {
    Ria(RiaScraper),
    Cnn(CnnScraper),
    Fox(FoxScraper),
}

impl Scraper {
    pub fn from_job(job: &Job, fetcher: Fetcher, settings: &HttpSettings) -> ScrapeResult<Self> {
        job.validate()?;
        let min_date = job.min_date()?;
        let paging = PagingOptions::new(job.max_pages, settings);

        let scraper = match &job.source {
            SourceConfig::Ria {
                start_url,
                base_url,
            } => Scraper::Ria(RiaScraper::new(
                min_date, start_url, base_url, paging, fetcher,
            )?),
            SourceConfig::Cnn {
                query,
                items_per_page,
                api_url,
            } => Scraper::Cnn(CnnScraper::new(
                query,
                min_date,
                *items_per_page,
                api_url,
                paging,
                fetcher,
            )?),
            SourceConfig::Fox {
                query,
                items_per_page,
                api_url,
                site_url,
            } => Scraper::Fox(FoxScraper::new(
                query,
                min_date,
                *items_per_page,
                api_url,
                site_url,
                paging,
                fetcher,
            )?),
        };
        Ok(scraper)
    }
}

impl NewsScraper for Scraper {
    fn name(&self) -> &'static str {
        match self {
            Scraper::Ria(s) => s.name(),
            Scraper::Cnn(s) => s.name(),
            Scraper::Fox(s) => s.name(),
        }
    }

    fn cutoff(&self) -> Cutoff {
        match self {
            Scraper::Ria(s) => s.cutoff(),
            Scraper::Cnn(s) => s.cutoff(),
            Scraper::Fox(s) => s.cutoff(),
        }
    }

    async fn scrape(&self) -> ScrapeResult<ScrapeOutput> {
        match self {
            Scraper::Ria(s) => s.scrape().await,
            Scraper::Cnn(s) => s.scrape().await,
            Scraper::Fox(s) => s.scrape().await,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::HttpSettings;
    use crate::http::{Fetcher, build_fetcher};
    use std::time::Duration;

    /// A fetcher that fails fast, for mock-server tests.
    pub fn fetcher() -> Fetcher {
        build_fetcher(&HttpSettings {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
            ..HttpSettings::default()
        })
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutoff::utc;
    use crate::errors::ScrapeError;

    fn entry(url: &str) -> ListingEntry {
        ListingEntry {
            url: url.to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-10T00:00:00Z").unwrap(),
            headline: format!("About {url}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_bodies_keeps_order_and_skips_failures() {
        let entries = vec![entry("a"), entry("broken"), entry("c")];
        let articles = fetch_bodies("test", entries, 3, |url| async move {
            if url == "broken" {
                Err(ScrapeError::Extraction("no body".to_string()))
            } else {
                Ok(format!("body of {url}"))
            }
        })
        .await;

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "a");
        assert_eq!(articles[0].body, "body of a");
        assert_eq!(articles[1].url, "c");
    }

    #[test]
    fn test_paging_options() {
        let settings = HttpSettings {
            concurrency: 0,
            ..HttpSettings::default()
        };
        let unlimited = PagingOptions::new(None, &settings);
        assert_eq!(unlimited.concurrency, 1);
        assert!(!unlimited.exhausted(1_000));

        let capped = PagingOptions::new(Some(2), &settings);
        assert!(!capped.exhausted(1));
        assert!(capped.exhausted(2));
    }

    #[test]
    fn test_from_job_picks_source() {
        let job = Job {
            source: SourceConfig::Cnn {
                query: "election".to_string(),
                items_per_page: 10,
                api_url: "https://search.example.com/content?sort=newest".to_string(),
            },
            min_date: "2024-01-10".to_string(),
            output: "out.csv".to_string(),
            zipped: true,
            raw_output: None,
            max_pages: None,
        };
        let scraper =
            Scraper::from_job(&job, test_support::fetcher(), &HttpSettings::default()).unwrap();

        assert_eq!(scraper.name(), "cnn");
        assert_eq!(
            scraper.cutoff(),
            "2024-01-10".parse::<crate::cutoff::MinDate>().unwrap().resolve(utc()).unwrap()
        );
    }

    #[test]
    fn test_from_job_rejects_bad_date() {
        let job = Job {
            source: SourceConfig::Ria {
                start_url: "https://ria.ru/politics/".to_string(),
                base_url: "https://ria.ru".to_string(),
            },
            min_date: "soon".to_string(),
            output: "out.csv".to_string(),
            zipped: true,
            raw_output: None,
            max_pages: None,
        };
        assert!(Scraper::from_job(&job, test_support::fetcher(), &HttpSettings::default()).is_err());
    }

    #[test]
    fn test_from_job_rejects_unrepresentable_cutoff() {
        let job = Job {
            source: SourceConfig::Ria {
                start_url: "https://ria.ru/politics/".to_string(),
                base_url: "https://ria.ru".to_string(),
            },
            min_date: "-262143-01-01".to_string(),
            output: "out.csv".to_string(),
            zipped: true,
            raw_output: None,
            max_pages: None,
        };
        let err = Scraper::from_job(&job, test_support::fetcher(), &HttpSettings::default())
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }
}
