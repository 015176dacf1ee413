//! CSV export of the scraped table, optionally wrapped in a zip archive.
//!
//! # Output Shape
//!
//! ```text
//! url,timestamp,headline,body
//! https://ria.ru/20240112/x.html,2024-01-12T00:00:00+03:00,Headline,"Body, with comma"
//! ```
//!
//! When zipped, the archive holds a single deflated entry named after the
//! output file with its `.zip` suffix removed (`cnn.csv.zip` → `cnn.csv`).

use crate::errors::ScrapeResult;
use crate::models::ScrapedArticle;
use itertools::Itertools;
use std::io::{Cursor, Write};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const HEADER: [&str; 4] = ["url", "timestamp", "headline", "body"];

/// Quote a field if it contains a delimiter, a quote or a line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    out.push_str(&fields.into_iter().map(escape_field).join(","));
    out.push('\n');
}

/// Render the table as CSV text.
pub fn to_csv(articles: &[ScrapedArticle]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER);
    for article in articles {
        let timestamp = article.timestamp.to_rfc3339();
        push_row(
            &mut out,
            [
                article.url.as_str(),
                timestamp.as_str(),
                article.headline.as_str(),
                article.body.as_str(),
            ],
        );
    }
    out
}

/// Name of the CSV entry inside a zip written to `path`.
pub fn archive_entry_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data.csv".to_string());
    match file_name.strip_suffix(".zip") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}

fn zip_bytes(entry_name: &str, contents: &[u8]) -> ScrapeResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)?;
    zip.write_all(contents)?;
    Ok(zip.finish()?.into_inner())
}

/// Write the table to `path`, zipped or as plain CSV.
///
/// The parent directory is created if it does not exist.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), zipped = zipped))]
pub async fn write_table(
    articles: &[ScrapedArticle],
    path: impl AsRef<Path>,
    zipped: bool,
) -> ScrapeResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let csv = to_csv(articles);
    let bytes = if zipped {
        zip_bytes(&archive_entry_name(path), csv.as_bytes())?
    } else {
        csv.into_bytes()
    };

    fs::write(path, &bytes).await?;
    info!(rows = articles.len(), bytes = bytes.len(), "Wrote CSV table");
    Ok(())
}
