//! CNN search API scraper.
//!
//! The search endpoint returns newest-first pages of articles, bodies included,
//! so no per-article request is needed:
//!
//! ```text
//! GET {api_url}&q={query}&size={items_per_page}&from={index}
//! {"result": [{"url": ..., "firstPublishDate": ..., "headline": ..., "body": ...}, ...]}
//! ```

use super::{NewsScraper, PagingOptions};
use crate::cutoff::{Cutoff, MinDate, utc};
use crate::errors::{ScrapeError, ScrapeResult};
use crate::http::{Fetch, Fetcher};
use crate::models::{ScrapeOutput, ScrapedArticle};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CnnItem {
    url: String,
    first_publish_date: String,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug)]
pub struct CnnScraper {
    query: String,
    items_per_page: usize,
    api_url: Url,
    cutoff: Cutoff,
    paging: PagingOptions,
    fetcher: Fetcher,
}

impl CnnScraper {
    pub fn new(
        query: &str,
        min_date: MinDate,
        items_per_page: usize,
        api_url: &str,
        paging: PagingOptions,
        fetcher: Fetcher,
    ) -> ScrapeResult<Self> {
        Ok(Self {
            query: query.to_string(),
            items_per_page,
            api_url: Url::parse(api_url)?,
            cutoff: min_date.resolve(utc())?,
            paging,
            fetcher,
        })
    }

    fn page_url(&self, from: usize) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &self.query)
            .append_pair("size", &self.items_per_page.to_string())
            .append_pair("from", &from.to_string());
        url
    }
}

impl NewsScraper for CnnScraper {
    fn name(&self) -> &'static str {
        "cnn"
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
            let result = parse_result(&text)?;
            out.pages += 1;

            let articles = cutoff.retain(decode_items(&result));
            out.source_data.push(result);

            if articles.is_empty() {
                info!(page, from = current_index, %cutoff, "CNN page has nothing newer than the cutoff; stopping");
                break;
            }

            let added = out.extend_page(articles);
            info!(page, from = current_index, added, total = out.articles.len(), "Scraped CNN page");

            if self.paging.exhausted(out.pages) {
                info!(pages = out.pages, "CNN page limit reached");
                break;
            }
            current_index += self.items_per_page;
        }

        Ok(out)
    }
}

/// Pull the `result` array out of a search response.
fn parse_result(text: &str) -> ScrapeResult<Value> {
    let mut response: Value = serde_json::from_str(text)?;
    match response.get_mut("result").map(Value::take) {
        Some(result @ Value::Array(_)) => Ok(result),
        Some(other) => Err(ScrapeError::Extraction(format!(
            "CNN `result` is not an array: {other}"
        ))),
        None => Err(ScrapeError::Extraction(
            "CNN response has no `result` field".to_string(),
        )),
    }
}

/// Decode every usable item of a `result` array. Items that fail are skipped.
fn decode_items(result: &Value) -> Vec<ScrapedArticle> {
    let items = result.as_array().map(Vec::as_slice).unwrap_or_default();
    items
        .iter()
        .filter_map(|raw| {
            let item = match CnnItem::deserialize(raw) {
                Ok(item) => item,
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable CNN item");
                    return None;
                }
            };
            match DateTime::parse_from_rfc3339(&item.first_publish_date) {
                Ok(timestamp) => Some(ScrapedArticle {
                    url: item.url,
                    timestamp,
                    headline: item.headline,
                    body: item.body.unwrap_or_default(),
                }),
                Err(e) => {
                    warn!(url = %item.url, date = %item.first_publish_date, error = %e, "Skipping CNN item with bad date");
                    None
                }
            }
        })
        .collect()
}
