//! Error type shared by the fetch layer, the scrapers and the exporters.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Transport failures (including a connection dropped mid-body),
    /// `429 Too Many Requests` and `5xx` responses are transient. Everything
    /// else (bad URLs, `404`, malformed payloads) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || interrupted_body(e)
            }
            ScrapeError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Whether reading the response body failed in transit.
///
/// `reqwest` reports a body cut short during `text()` as a decode error whose
/// source is the underlying body error, so the whole chain is checked.
fn interrupted_body(e: &reqwest::Error) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = current {
        if err.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_body) {
            return true;
        }
        current = err.source();
    }
    false
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
