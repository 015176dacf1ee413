//! Data models for scraped articles and the result of a scrape.
//!
//! - [`ScrapedArticle`]: one normalized row (`url`, `timestamp`, `headline`, `body`)
//! - [`ScrapeOutput`]: the accumulated table plus the raw pages it came from

use chrono::{DateTime, FixedOffset};
use std::collections::HashSet;
use tracing::debug;

/// A single article, normalized across every source.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedArticle {
    /// Absolute URL of the article.
    pub url: String,
    /// Publish time, with the offset the source reported (or implied).
    pub timestamp: DateTime<FixedOffset>,
    /// The article headline.
    pub headline: String,
    /// The article text.
    pub body: String,
}

/// Everything a scraper accumulated over its pagination loop.
#[derive(Debug, Default)]
pub struct ScrapeOutput {
    /// Articles in listing order, without duplicate URLs.
    pub articles: Vec<ScrapedArticle>,
    /// Raw JSON pages as returned by API-backed sources.
    pub source_data: Vec<serde_json::Value>,
    /// Number of listing pages fetched.
    pub pages: usize,
    seen: HashSet<String>,
}

impl ScrapeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page of articles, dropping URLs that were already kept.
    ///
    /// Returns how many articles were actually added.
    pub fn extend_page(&mut self, page: Vec<ScrapedArticle>) -> usize {
        let before = self.articles.len();
        let fresh = page
            .into_iter()
            .filter(|a| self.seen.insert(a.url.clone()))
            .collect::<Vec<_>>();
        self.articles.extend(fresh);

        let added = self.articles.len() - before;
        debug!(added, total = self.articles.len(), "Extended scrape output");
        added
    }

    /// The oldest timestamp kept so far.
    pub fn oldest(&self) -> Option<DateTime<FixedOffset>> {
        self.articles.iter().map(|a| a.timestamp).min()
    }
}
