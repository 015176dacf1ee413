//! RIA Novosti rubric scraper.
//!
//! RIA rubric pages (`https://ria.ru/politics/`) render the first batch of
//! stories inline and expose a "load more" URL. Every further batch is an HTML
//! fragment that carries the URL of the batch after it.
//!
//! # Page Shapes
//!
//! | Page | Entries | Next URL |
//! |------|---------|----------|
//! | first | `div.rubric-list a.list-item__title` | `div.list-more[data-url]` |
//! | later | `div.list-items-loaded a.list-item__title` | `div.list-items-loaded[data-next-url]` |
//!
//! # Dates
//!
//! Listing entries carry no timestamp. The publish date is taken from the
//! `/YYYYMMDD/` segment of the article URL and read as midnight Moscow time.

use super::{ListingEntry, NewsScraper, PagingOptions, fetch_bodies};
use crate::cutoff::{Cutoff, MinDate, moscow};
use crate::errors::{ScrapeError, ScrapeResult};
use crate::http::{Fetch, Fetcher};
use crate::models::ScrapeOutput;
use crate::utils::truncate_for_log;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static FIRST_CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.rubric-list").expect("valid selector"));
static FIRST_NEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.list-more").expect("valid selector"));
static LOADED_CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.list-items-loaded").expect("valid selector"));
static ITEM_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.list-item__title").expect("valid selector"));
static TEXT_BLOCK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div.article__block[data-type="text"]"#).expect("valid selector")
});

static URL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{8})/").expect("valid regex"));
static DATELINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+? [-–—‑] РИА Новости.)").expect("valid regex"));

/// One page of the rubric listing.
#[derive(Debug, Default, PartialEq)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    pub next_url: Option<Url>,
}

#[derive(Debug)]
pub struct RiaScraper {
    start_url: Url,
    base_url: Url,
    cutoff: Cutoff,
    paging: PagingOptions,
    fetcher: Fetcher,
}

impl RiaScraper {
    pub fn new(
        min_date: MinDate,
        start_url: &str,
        base_url: &str,
        paging: PagingOptions,
        fetcher: Fetcher,
    ) -> ScrapeResult<Self> {
        Ok(Self {
            start_url: Url::parse(start_url)?,
            base_url: Url::parse(base_url)?,
            cutoff: min_date.resolve(moscow())?,
            paging,
            fetcher,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_body(&self, url: String) -> ScrapeResult<String> {
        let html = self.fetcher.fetch_text(&Url::parse(&url)?).await?;
        let body = extract_body(&html);
        if body.is_empty() {
            warn!(%url, "RIA article has no text blocks");
        }
        Ok(body)
    }
}

impl NewsScraper for RiaScraper {
    fn name(&self) -> &'static str {
        "ria"
    }

    fn cutoff(&self) -> Cutoff {
        self.cutoff
    }

    #[instrument(level = "info", skip_all, fields(start_url = %self.start_url, cutoff = %self.cutoff))]
    async fn scrape(&self) -> ScrapeResult<ScrapeOutput> {
        let cutoff = self.cutoff();
        let mut out = ScrapeOutput::new();
        let mut current = Some(self.start_url.clone());

        while let Some(url) = current.take() {
            let page = out.pages;
            let html = self.fetcher.fetch_text(&url).await?;
            let listing = parse_listing(&html, page == 0, &self.base_url)?;
            out.pages += 1;

            if listing.entries.is_empty() {
                info!(page, %url, "RIA listing page is empty; stopping");
                break;
            }

            let reached_cutoff = listing.entries.iter().any(|e| !cutoff.admits(&e.timestamp));
            let fresh = listing
                .entries
                .into_iter()
                .filter(|e| cutoff.admits(&e.timestamp))
                .collect::<Vec<_>>();
            let fresh_count = fresh.len();

            let articles = fetch_bodies(self.name(), fresh, self.paging.concurrency, |u| {
                self.fetch_body(u)
            })
            .await;
            let added = out.extend_page(articles);
            info!(page, fresh = fresh_count, added, total = out.articles.len(), "Scraped RIA page");

            if reached_cutoff {
                info!(page, %cutoff, "RIA listing reached the cutoff date");
                break;
            }
            if self.paging.exhausted(out.pages) {
                info!(pages = out.pages, "RIA page limit reached");
                break;
            }
            current = listing.next_url;
            if current.is_none() {
                info!(page, "RIA listing has no next page");
            }
        }

        Ok(out)
    }
}

/// Parse one RIA listing page. `first` selects the rubric-page layout.
///
/// A page without the listing container is an error. A container with no
/// entries is an ordinary empty page.
pub fn parse_listing(html: &str, first: bool, base_url: &Url) -> ScrapeResult<ListingPage> {
    let document = Html::parse_document(html);

    let (container, next_url) = if first {
        let container = document.select(&FIRST_CONTAINER).next();
        let next = document
            .select(&FIRST_NEXT)
            .next()
            .and_then(|el| el.value().attr("data-url"));
        (container, next)
    } else {
        let container = document.select(&LOADED_CONTAINER).next();
        let next = container.and_then(|el| el.value().attr("data-next-url"));
        (container, next)
    };

    let container = container.ok_or_else(|| {
        let expected = if first { "div.rubric-list" } else { "div.list-items-loaded" };
        ScrapeError::Extraction(format!(
            "RIA listing has no {expected} container: {}",
            truncate_for_log(html.trim(), 120)
        ))
    })?;
    let entries = parse_entries(container, base_url);
    let next_url = next_url.and_then(|href| match base_url.join(href) {
        Ok(u) => Some(u),
        Err(e) => {
            warn!(%href, error = %e, "Unusable RIA next-page URL");
            None
        }
    });

    debug!(entries = entries.len(), next = ?next_url.as_ref().map(Url::as_str), "Parsed RIA listing");
    Ok(ListingPage { entries, next_url })
}

fn parse_entries(container: ElementRef<'_>, base_url: &Url) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    for link in container.select(&ITEM_TITLE) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = match base_url.join(href) {
            Ok(u) => u.to_string(),
            Err(e) => {
                warn!(%href, error = %e, "Skipping RIA entry with bad URL");
                continue;
            }
        };
        let Some(timestamp) = date_from_url(&url) else {
            warn!(%url, "Skipping RIA entry without a date in its URL");
            continue;
        };
        let headline = link.text().collect::<String>().trim().to_string();
        entries.push(ListingEntry {
            url,
            timestamp,
            headline,
        });
    }
    entries
}

/// Midnight Moscow time of the `/YYYYMMDD/` segment in an article URL.
pub fn date_from_url(url: &str) -> Option<DateTime<FixedOffset>> {
    let digits = URL_DATE.captures(url)?.get(1)?.as_str();
    let date = NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?;
    moscow()
        .from_local_datetime(&date.and_time(NaiveTime::default()))
        .single()
}

/// Article text with the leading "<place>, <date> - РИА Новости." dateline removed.
pub fn extract_body(html: &str) -> String {
    let document = Html::parse_document(html);
    let text = document
        .select(&TEXT_BLOCK)
        .map(|el| el.text().collect::<String>())
        .collect::<String>();
    let body = DATELINE.replace(&text, "").trim().to_string();
    debug!(bytes = body.len(), preview = %truncate_for_log(&body, 80), "Parsed RIA article");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use crate::cutoff::MinDate;
    use crate::scrapers::test_support;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn first_page(base: &str) -> String {
        format!(
            r#"<html><body>
            <div class="rubric-list">
              <div class="list-item"><a class="list-item__title" href="{base}/20240112/first.html">First story</a></div>
              <div class="list-item"><a class="list-item__title" href="{base}/20240111/second.html"> Second story </a></div>
              <div class="list-item"><a class="list-item__title" href="{base}/about.html">Undated</a></div>
            </div>
            <div class="list-more" data-url="/services/politics/more.html?id=2"></div>
            </body></html>"#
        )
    }

    fn second_page(base: &str) -> String {
        format!(
            r#"<div class="list-items-loaded" data-next-url="/services/politics/more.html?id=3">
              <div class="list-item"><a class="list-item__title" href="{base}/20240110/third.html">Third story</a></div>
              <div class="list-item"><a class="list-item__title" href="{base}/20240108/old.html">Old story</a></div>
            </div>"#
        )
    }

    fn article(text: &str) -> String {
        format!(
            r#"<html><body><div class="article__body">
            <div class="article__block" data-type="text">МОСКВА, 12 янв - РИА Новости. {text}</div>
            <div class="article__block" data-type="media">ignored</div>
            <div class="article__block" data-type="text"> Second paragraph.</div>
            </div></body></html>"#
        )
    }

    #[test]
    fn test_parse_first_listing() {
        let base = Url::parse("https://ria.ru").unwrap();
        let page = parse_listing(&first_page("https://ria.ru"), true, &base).unwrap();

        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].url, "https://ria.ru/20240112/first.html");
        assert_eq!(page.entries[1].headline, "Second story");
        assert_eq!(
            page.next_url.unwrap().as_str(),
            "https://ria.ru/services/politics/more.html?id=2"
        );
    }

    #[test]
    fn test_parse_loaded_listing() {
        let base = Url::parse("https://ria.ru").unwrap();
        let page = parse_listing(&second_page("https://ria.ru"), false, &base).unwrap();

        assert_eq!(page.entries.len(), 2);
        assert_eq!(
            page.next_url.unwrap().as_str(),
            "https://ria.ru/services/politics/more.html?id=3"
        );
    }

    #[test]
    fn test_parse_listing_without_container() {
        let base = Url::parse("https://ria.ru").unwrap();
        let html = "<html><body><p>maintenance</p></body></html>";

        for first in [true, false] {
            let err = parse_listing(html, first, &base).unwrap_err();
            assert!(matches!(err, ScrapeError::Extraction(_)));
        }
    }

    #[test]
    fn test_parse_listing_with_empty_container() {
        let base = Url::parse("https://ria.ru").unwrap();
        let html = r#"<div class="list-items-loaded"></div>"#;
        let page = parse_listing(html, false, &base).unwrap();
        assert_eq!(page, ListingPage::default());
    }

    #[test]
    fn test_extract_body_strips_only_leading_dateline() {
        let html = r#"<div class="article__block" data-type="text">МОСКВА, 12 янв - РИА Новости. Как сообщил ТАСС - РИА Новости. узнали позже.</div>"#;
        assert_eq!(
            extract_body(html),
            "Как сообщил ТАСС - РИА Новости. узнали позже."
        );
    }

    #[test]
    fn test_relative_hrefs_resolve_against_base() {
        let base = Url::parse("https://ria.ru").unwrap();
        let html = r#"<div class="rubric-list"><a class="list-item__title" href="/20240112/rel.html">Rel</a></div>"#;
        let page = parse_listing(html, true, &base).unwrap();
        assert_eq!(page.entries[0].url, "https://ria.ru/20240112/rel.html");
        assert_eq!(page.next_url, None);
    }

    #[test]
    fn test_date_from_url() {
        let ts = date_from_url("https://ria.ru/20240112/some-story-1234.html").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-12T00:00:00+03:00");
        assert_eq!(date_from_url("https://ria.ru/politics/"), None);
        assert_eq!(date_from_url("https://ria.ru/20241399/bad-date.html"), None);
    }

    #[test]
    fn test_extract_body_strips_dateline() {
        let body = extract_body(&article("Текст новости."));
        assert_eq!(body, "Текст новости. Second paragraph.");
    }

    #[test]
    fn test_extract_body_dash_variants() {
        for dash in ["-", "–", "—", "‑"] {
            let html = format!(
                r#"<div class="article__block" data-type="text">КИЕВ, 1 фев {dash} РИА Новости. Тело.</div>"#
            );
            assert_eq!(extract_body(&html), "Тело.");
        }
    }

    #[test]
    fn test_extract_body_without_dateline() {
        let html = r#"<div class="article__block" data-type="text">Just text.</div>"#;
        assert_eq!(extract_body(html), "Just text.");
    }

    #[tokio::test]
    async fn test_scrape_pages_until_cutoff() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/politics/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(first_page(&base)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/politics/more.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(second_page(&base)))
            .expect(1)
            .mount(&server)
            .await;
        for slug in ["20240112/first.html", "20240111/second.html", "20240110/third.html"] {
            Mock::given(method("GET"))
                .and(path(format!("/{slug}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(article(slug)))
                .expect(1)
                .mount(&server)
                .await;
        }
        // Older than the cutoff: never requested.
        Mock::given(method("GET"))
            .and(path("/20240108/old.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article("old")))
            .expect(0)
            .mount(&server)
            .await;

        let scraper = RiaScraper::new(
            "2024-01-10".parse::<MinDate>().unwrap(),
            &format!("{base}/politics/"),
            &base,
            PagingOptions::new(None, &HttpSettings::default()),
            test_support::fetcher(),
        )
        .unwrap();
        let out = scraper.scrape().await.unwrap();

        assert_eq!(out.pages, 2);
        assert_eq!(out.articles.len(), 3);
        assert_eq!(out.articles[0].headline, "First story");
        assert_eq!(out.articles[0].body, "20240112/first.html Second paragraph.");
        assert_eq!(out.articles[2].timestamp.to_rfc3339(), "2024-01-10T00:00:00+03:00");
        assert!(out.source_data.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_respects_page_limit() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/politics/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(first_page(&base)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/politics/more.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(second_page(&base)))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article("x")))
            .mount(&server)
            .await;

        let scraper = RiaScraper::new(
            "2020-01-01".parse::<MinDate>().unwrap(),
            &format!("{base}/politics/"),
            &base,
            PagingOptions::new(Some(1), &HttpSettings::default()),
            test_support::fetcher(),
        )
        .unwrap();
        let out = scraper.scrape().await.unwrap();

        assert_eq!(out.pages, 1);
        assert_eq!(out.articles.len(), 2);
    }

    #[tokio::test]
    async fn test_scrape_fails_when_listing_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/politics/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = RiaScraper::new(
            "2024-01-10".parse::<MinDate>().unwrap(),
            &format!("{}/politics/", server.uri()),
            &server.uri(),
            PagingOptions::new(None, &HttpSettings::default()),
            test_support::fetcher(),
        )
        .unwrap();
        assert!(scraper.scrape().await.is_err());
    }

    #[tokio::test]
    async fn test_scrape_fails_on_unrecognised_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/politics/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><h1>Access denied</h1></body></html>"),
            )
            .mount(&server)
            .await;

        let scraper = RiaScraper::new(
            "2024-01-10".parse::<MinDate>().unwrap(),
            &format!("{}/politics/", server.uri()),
            &server.uri(),
            PagingOptions::new(None, &HttpSettings::default()),
            test_support::fetcher(),
        )
        .unwrap();
        let err = scraper.scrape().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction(_)));
    }
}
