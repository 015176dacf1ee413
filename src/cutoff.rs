//! Cutoff dates and their alignment to a source's timezone.
//!
//! A cutoff given as a plain date (`2024-01-10`) means "midnight of that day"
//! in whatever timezone the source publishes in. RIA dates its URLs in Moscow
//! time, while the CNN and Fox APIs report UTC, so the same `--min-date` must
//! resolve to different instants per source. A cutoff given as a full RFC 3339
//! timestamp is already an instant and is used as-is.

use crate::errors::{ScrapeError, ScrapeResult};
use crate::models::ScrapedArticle;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// Moscow time, used by RIA.
pub fn moscow() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap_or_else(utc)
}

pub fn utc() -> FixedOffset {
    Utc.fix()
}

/// The user-supplied minimum publish date, before timezone alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinDate {
    /// `YYYY-MM-DD`
    Date(NaiveDate),
    /// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`
    WallClock(NaiveDateTime),
    /// RFC 3339 with an explicit offset.
    Instant(DateTime<FixedOffset>),
}

impl FromStr for MinDate {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(MinDate::Date(d));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(MinDate::Instant(dt));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(MinDate::WallClock(dt));
            }
        }
        Err(ScrapeError::Config(format!(
            "invalid min date {s:?} (expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)"
        )))
    }
}

impl fmt::Display for MinDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinDate::Date(d) => write!(f, "{d}"),
            MinDate::WallClock(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            MinDate::Instant(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl MinDate {
    /// Place the date in a source's timezone.
    ///
    /// Fails for dates at the edge of the representable range, where the
    /// shift to UTC would overflow.
    pub fn resolve(&self, offset: FixedOffset) -> ScrapeResult<Cutoff> {
        let instant = match self {
            MinDate::Date(d) => local_instant(offset, d.and_time(NaiveTime::default())),
            MinDate::WallClock(dt) => local_instant(offset, *dt),
            MinDate::Instant(dt) => Some(*dt),
        };
        instant.map(Cutoff).ok_or_else(|| {
            ScrapeError::Config(format!("min date {self} is out of range for offset {offset}"))
        })
    }
}

fn local_instant(offset: FixedOffset, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    let utc = naive.checked_sub_signed(shift)?;
    Some(offset.from_utc_datetime(&utc))
}

/// The earliest instant still worth scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff(DateTime<FixedOffset>);

impl Cutoff {
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.0
    }

    pub fn admits(&self, ts: &DateTime<FixedOffset>) -> bool {
        *ts >= self.0
    }

    /// Keep only the articles published at or after the cutoff.
    pub fn retain(&self, articles: Vec<ScrapedArticle>) -> Vec<ScrapedArticle> {
        articles
            .into_iter()
            .filter(|a| self.admits(&a.timestamp))
            .collect()
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instant().to_rfc3339())
    }
}
