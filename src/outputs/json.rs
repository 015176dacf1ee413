//! Raw source-data dump.
//!
//! API-backed scrapers keep every search page exactly as the API returned it.
//! This writes those pages as one pretty-printed JSON array, page order kept,
//! so a scrape can be inspected or re-parsed without hitting the API again.

use crate::errors::ScrapeResult;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), pages = pages.len()))]
pub async fn write_source_data(pages: &[Value], path: impl AsRef<Path>) -> ScrapeResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(pages)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create source data dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote raw source data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_source_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw/cnn.json");
        let pages = vec![json!([{"url": "a"}]), json!([])];

        write_source_data(&pages, &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, pages);
    }
}
