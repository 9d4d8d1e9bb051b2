//! CSV export of an ingested batch.

use crate::error::{PapersError, Result};
use crate::model::CanonicalPaper;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Flat CSV row
#[derive(Debug, Serialize)]
struct PaperRow<'a> {
    title: &'a str,
    date: String,
    source: &'static str,
    url: &'a str,
    authors: String,
    topics: String,
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
}

impl<'a> From<&'a CanonicalPaper> for PaperRow<'a> {
    fn from(paper: &'a CanonicalPaper) -> Self {
        Self {
            title: &paper.title,
            date: paper.published_date.format("%Y-%m-%d").to_string(),
            source: paper.source.as_str(),
            url: &paper.url,
            authors: paper.authors.join("; "),
            topics: paper.topics.iter().map(String::as_str).collect::<Vec<_>>().join(","),
            abstract_text: &paper.abstract_text,
        }
    }
}

/// Write `papers` to `path` with a header row. Returns the number of rows.
pub fn save_csv(path: &Path, papers: &[CanonicalPaper]) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PapersError::Store(format!("Failed to create CSV writer: {}", e)))?;

    for paper in papers {
        wtr.serialize(PaperRow::from(paper))
            .map_err(|e| PapersError::Store(format!("Failed to write CSV record: {}", e)))?;
    }

    wtr.flush()?;
    info!(path = ?path, rows = papers.len(), "Saved CSV");
    Ok(papers.len())
}
