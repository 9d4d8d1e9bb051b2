//! arXiv API adapter
//!
//! Queries the arXiv export API for the newest submissions in a `cs.*`
//! category and normalizes the Atom feed.
//!
//! API notes:
//! - Results are sorted server-side by submission date, so exactly
//!   `max_results` entries are requested and all of them are kept.
//! - Errors come back as a regular feed whose single entry id points at
//!   `/api/errors`.

use super::{collapse_whitespace, fetch_text, SourceAdapter};
use crate::catalog::{Topic, TopicCatalog};
use crate::error::{PapersError, Result};
use crate::model::{parse_iso_date, CanonicalPaper, SourceName, TopicOrigin};
use crate::registry::DedupRegistry;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// arXiv export API base URL
pub const ARXIV_API_BASE: &str = "http://export.arxiv.org";

/// Marker in the id of an error entry
const ARXIV_ERROR_MARKER: &str = "/api/errors";

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    summary: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// Adapter for the arXiv export API
pub struct ArxivAdapter {
    client: Client,
    registry: Arc<DedupRegistry>,
    catalog: Arc<TopicCatalog>,
    base_url: String,
    max_results: usize,
}

impl ArxivAdapter {
    pub fn new(
        client: Client,
        registry: Arc<DedupRegistry>,
        catalog: Arc<TopicCatalog>,
        max_results: usize,
    ) -> Self {
        Self {
            client,
            registry,
            catalog,
            base_url: ARXIV_API_BASE.to_string(),
            max_results,
        }
    }

    /// Point the adapter at a mirror or a local test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn query_url(&self, topic: &Topic) -> Result<Url> {
        let endpoint = format!("{}/api/query", self.base_url.trim_end_matches('/'));
        Url::parse_with_params(
            &endpoint,
            &[
                ("search_query", format!("cat:cs.{}", topic.code)),
                ("sortBy", "submittedDate".to_string()),
                ("max_results", self.max_results.to_string()),
            ],
        )
        .map_err(|e| PapersError::Config(format!("Invalid arXiv URL {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn name(&self) -> SourceName {
        SourceName::Arxiv
    }

    async fn fetch(&self, topic: &Topic) -> Result<Vec<CanonicalPaper>> {
        let url = self.query_url(topic)?;
        debug!(topic = %topic.code, url = %url, "Fetching arXiv feed");

        let body = fetch_text(self.client.get(url), SourceName::Arxiv).await?;
        let papers = parse_feed(&body, topic, &self.catalog, &self.registry)?;

        info!(topic = %topic.code, count = papers.len(), "Parsed arXiv results");
        Ok(papers)
    }
}

/// Parse an arXiv Atom feed into canonical papers, dropping already-seen ids.
pub(crate) fn parse_feed(
    xml: &str,
    topic: &Topic,
    catalog: &TopicCatalog,
    registry: &DedupRegistry,
) -> Result<Vec<CanonicalPaper>> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)?;

    if let Some(error) = feed
        .entries
        .iter()
        .find(|e| e.id.as_deref().is_some_and(|id| id.contains(ARXIV_ERROR_MARKER)))
    {
        return Err(PapersError::Api {
            code: 400,
            message: error
                .summary
                .as_deref()
                .map(collapse_whitespace)
                .unwrap_or_else(|| "arXiv API error".to_string()),
        });
    }

    let mut papers = Vec::with_capacity(feed.entries.len());
    let mut skipped = 0usize;
    let mut duplicates = 0usize;

    for entry in feed.entries {
        let Some(paper) = convert_entry(entry, topic, catalog) else {
            skipped += 1;
            continue;
        };
        if !registry.check_and_mark(SourceName::Arxiv, &paper.url) {
            duplicates += 1;
            continue;
        }
        papers.push(paper);
    }

    debug!(
        topic = %topic.code,
        kept = papers.len(),
        skipped = skipped,
        duplicates = duplicates,
        "arXiv feed filtered"
    );

    Ok(papers)
}

/// Convert one Atom entry, or `None` when a required field is missing.
fn convert_entry(entry: AtomEntry, topic: &Topic, catalog: &TopicCatalog) -> Option<CanonicalPaper> {
    let url = entry.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty())?;
    let title = entry
        .title
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())?;
    let published_date = entry.published.as_deref().and_then(parse_iso_date)?;

    let authors = entry
        .authors
        .into_iter()
        .filter_map(|a| a.name)
        .map(|name| collapse_whitespace(&name))
        .filter(|name| !name.is_empty())
        .collect();

    let tagged: BTreeSet<String> = entry
        .categories
        .iter()
        .filter_map(|c| c.term.as_deref())
        .filter_map(|term| catalog.from_arxiv_category(term))
        .map(|t| t.code.clone())
        .collect();

    let (topics, topic_origin) = if tagged.is_empty() {
        (BTreeSet::from([topic.code.clone()]), TopicOrigin::Fallback)
    } else {
        (tagged, TopicOrigin::Tagged)
    };

    Some(CanonicalPaper {
        title,
        published_date,
        abstract_text: entry.summary.map(|s| collapse_whitespace(&s)).unwrap_or_default(),
        url,
        source: SourceName::Arxiv,
        authors,
        topics,
        topic_origin,
    })
}
