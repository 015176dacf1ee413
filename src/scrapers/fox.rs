//! Fox News tag search scraper.
//!
//! The article-search API lists stories newest-first but carries no body text.
//! Each article page embeds its text as schema.org `NewsArticle` JSON-LD, which
//! is where the body is read from. Video items are dropped before anything
//! else happens.

use super::{ListingEntry, NewsScraper, PagingOptions, fetch_bodies};
use crate::cutoff::{Cutoff, MinDate, utc};
use crate::errors::{ScrapeError, ScrapeResult};
use crate::http::{Fetch, Fetcher};
use crate::models::ScrapeOutput;
use chrono::DateTime;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoxItem {
    url: String,
    publication_date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: Option<FoxCategory>,
}

#[derive(Debug, Deserialize)]
struct FoxCategory {
    #[serde(default)]
    name: String,
}

impl FoxItem {
    fn is_video(&self) -> bool {
        self.category.as_ref().is_some_and(|c| c.name == "VIDEO")
    }
}

#[derive(Debug)]
pub struct FoxScraper {
    query: String,
    items_per_page: usize,
    api_url: Url,
    site_url: String,
    cutoff: Cutoff,
    paging: PagingOptions,
    fetcher: Fetcher,
}

impl FoxScraper {
    pub fn new(
        query: &str,
        min_date: MinDate,
        items_per_page: usize,
        api_url: &str,
        site_url: &str,
        paging: PagingOptions,
        fetcher: Fetcher,
    ) -> ScrapeResult<Self> {
        // Entry URLs are built by concatenation, so only check the base parses.
        Url::parse(site_url)?;
        Ok(Self {
            query: query.to_string(),
            items_per_page,
            api_url: Url::parse(api_url)?,
            site_url: site_url.trim_end_matches('/').to_string(),
            cutoff: min_date.resolve(utc())?,
            paging,
            fetcher,
        })
    }

    fn page_url(&self, from: usize) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("values", &self.query)
            .append_pair("size", &self.items_per_page.to_string())
            .append_pair("from", &from.to_string());
        url
    }

    /// Non-video entries of one search page, in listing order.
    fn listing_entries(&self, page: &Value) -> ScrapeResult<Vec<ListingEntry>> {
        let items = page.as_array().ok_or_else(|| {
            ScrapeError::Extraction("Fox search response is not an array".to_string())
        })?;

        let mut entries = Vec::new();
        for raw in items {
            let item = match FoxItem::deserialize(raw) {
                Ok(item) => item,
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable Fox item");
                    continue;
                }
            };
            if item.is_video() {
                debug!(url = %item.url, "Skipping Fox video item");
                continue;
            }
            let timestamp = match DateTime::parse_from_rfc3339(&item.publication_date) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(url = %item.url, date = %item.publication_date, error = %e, "Skipping Fox item with bad date");
                    continue;
                }
            };
            entries.push(ListingEntry {
                url: format!("{}{}", self.site_url, item.url),
                timestamp,
                headline: item.title,
            });
        }
        Ok(entries)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_body(&self, url: String) -> ScrapeResult<String> {
        let html = self.fetcher.fetch_text(&Url::parse(&url)?).await?;
        extract_article_body(&html)
            .ok_or_else(|| ScrapeError::Extraction(format!("no NewsArticle JSON-LD in {url}")))
    }
}

impl NewsScraper for FoxScraper {
    fn name(&self) -> &'static str {
        "fox"
    }

    fn cutoff(&self) -> Cutoff {
        self.cutoff
    }

    #[instrument(level = "info", skip_all, fields(query = %self.query, cutoff = %self.cutoff))]
    async fn scrape(&self) -> ScrapeResult<ScrapeOutput> {
        let cutoff = self.cutoff();
        let mut out = ScrapeOutput::new();
        let mut current_index = 0usize;

        loop {
            let page = out.pages;
            let url = self.page_url(current_index);
            let text = self.fetcher.fetch_text(&url).await?;
            let raw: Value = serde_json::from_str(&text)?;
            let entries = self.listing_entries(&raw)?;
            out.source_data.push(raw);
            out.pages += 1;

            let fresh = entries
                .into_iter()
                .filter(|e| cutoff.admits(&e.timestamp))
                .collect::<Vec<_>>();
            if fresh.is_empty() {
                info!(page, from = current_index, %cutoff, "Fox page has nothing newer than the cutoff; stopping");
                break;
            }
            let fresh_count = fresh.len();

            let articles = fetch_bodies(self.name(), fresh, self.paging.concurrency, |u| {
                self.fetch_body(u)
            })
            .await;
            let added = out.extend_page(articles);
            info!(page, from = current_index, fresh = fresh_count, added, total = out.articles.len(), "Scraped Fox page");

            if self.paging.exhausted(out.pages) {
                info!(pages = out.pages, "Fox page limit reached");
                break;
            }
            current_index += self.items_per_page;
        }

        Ok(out)
    }
}

/// `articleBody` of the first schema.org `NewsArticle` in the page's JSON-LD.
pub fn extract_article_body(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&LD_JSON).find_map(|script| {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => find_news_article_body(&value).map(str::to_string),
            Err(e) => {
                debug!(error = %e, "Ignoring unparsable JSON-LD block");
                None
            }
        }
    })
}

fn find_news_article_body(value: &Value) -> Option<&str> {
    match value {
        Value::Array(items) => items.iter().find_map(find_news_article_body),
        Value::Object(map) => {
            if is_news_article(map.get("@type")) {
                if let Some(body) = map.get("articleBody").and_then(Value::as_str) {
                    return Some(body);
                }
            }
            map.get("@graph").and_then(find_news_article_body)
        }
        _ => None,
    }
}

fn is_news_article(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(s)) => s == "NewsArticle",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("NewsArticle")),
        _ => false,
    }
}
