//! Semantic Scholar API adapter
//!
//! Searches the graph API by topic name and keeps the most recent papers.
//!
//! API Details:
//! - Search endpoint: GET /graph/v1/paper/search
//! - Results are relevance-ranked, so `max_papers + overfetch` candidates are
//!   requested and the newest `max_papers` are selected locally
//! - Rate limit: 1 req/s (unauthenticated), higher with API key

use super::{collapse_whitespace, fetch_text, SourceAdapter};
use crate::catalog::Topic;
use crate::error::{OptionExt, PapersError, Result};
use crate::model::{parse_iso_date, CanonicalPaper, OneOrMany, SourceName, TopicOrigin};
use crate::recency;
use crate::registry::DedupRegistry;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Semantic Scholar API base URL
pub const S2_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Fields requested for every search hit
const S2_FIELDS: &str = "paperId,title,url,abstract,publicationDate,authors";

/// Field-of-study restriction for every search
const S2_FIELD_OF_STUDY: &str = "Computer Science";

/// Paper page used when a hit carries no url
const S2_PAPER_PAGE: &str = "https://www.semanticscholar.org/paper";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "publicationDate")]
    publication_date: Option<String>,
    authors: Option<OneOrMany<serde_json::Value>>,
}

/// Adapter for the Semantic Scholar graph search API
pub struct SemanticScholarAdapter {
    client: Client,
    registry: Arc<DedupRegistry>,
    base_url: String,
    max_papers: usize,
    overfetch: usize,
    year: Option<String>,
    api_key: Option<String>,
}

impl SemanticScholarAdapter {
    pub fn new(client: Client, registry: Arc<DedupRegistry>, max_papers: usize) -> Self {
        Self {
            client,
            registry,
            base_url: S2_API_BASE.to_string(),
            max_papers,
            overfetch: 0,
            year: None,
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request this many extra candidates for the recency selection.
    pub fn with_overfetch(mut self, overfetch: usize) -> Self {
        self.overfetch = overfetch;
        self
    }

    /// Restrict results by publication year ("2024", "2022-2024", "2023-").
    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn search_url(&self, topic: &Topic) -> Result<Url> {
        let endpoint = format!("{}/paper/search", self.base_url.trim_end_matches('/'));
        let limit = (self.max_papers + self.overfetch).to_string();

        let mut params = vec![
            ("query", topic.name.as_str()),
            ("fieldsOfStudy", S2_FIELD_OF_STUDY),
            ("fields", S2_FIELDS),
            ("limit", limit.as_str()),
        ];
        if let Some(year) = self.year.as_deref() {
            params.push(("year", year));
        }

        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| PapersError::Config(format!("Invalid Semantic Scholar URL {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn name(&self) -> SourceName {
        SourceName::SemanticScholar
    }

    async fn fetch(&self, topic: &Topic) -> Result<Vec<CanonicalPaper>> {
        let url = self.search_url(topic)?;
        debug!(topic = %topic.code, url = %url, "Searching Semantic Scholar");

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let body = fetch_text(request, SourceName::SemanticScholar).await?;
        let papers = parse_search(&body, topic, &self.registry, self.max_papers)?;

        info!(topic = %topic.code, count = papers.len(), "Parsed Semantic Scholar results");
        Ok(papers)
    }
}

/// Parse a search response, dedup-filter it and keep the `k` newest papers.
pub(crate) fn parse_search(
    json: &str,
    topic: &Topic,
    registry: &DedupRegistry,
    k: usize,
) -> Result<Vec<CanonicalPaper>> {
    let response: SearchResponse = serde_json::from_str(json).map_err(|e| {
        PapersError::Parse(format!("Failed to parse Semantic Scholar response: {}", e))
    })?;
    let hits = response
        .data
        .ok_or_parse("Semantic Scholar response has no data array")?;

    let total = hits.len();
    let mut candidates = Vec::with_capacity(total);
    let mut duplicates = 0usize;

    for hit in hits {
        let Some(paper) = serde_json::from_value::<S2Paper>(hit)
            .ok()
            .and_then(|raw| convert_paper(raw, topic))
        else {
            continue;
        };
        if !registry.check_and_mark(SourceName::SemanticScholar, &paper.url) {
            duplicates += 1;
            continue;
        }
        candidates.push(paper);
    }

    let eligible = candidates.len();
    let picked = recency::select(
        candidates
            .iter()
            .enumerate()
            .map(|(index, paper)| (paper.published_date, index)),
        k,
    );

    let mut slots: Vec<Option<CanonicalPaper>> = candidates.into_iter().map(Some).collect();
    let papers: Vec<CanonicalPaper> = picked
        .into_iter()
        .filter_map(|index| slots.get_mut(index).and_then(Option::take))
        .collect();

    debug!(
        topic = %topic.code,
        total = total,
        eligible = eligible,
        duplicates = duplicates,
        kept = papers.len(),
        "Semantic Scholar results selected"
    );

    Ok(papers)
}

/// Convert one search hit, or `None` when it cannot be ranked or shown.
fn convert_paper(raw: S2Paper, topic: &Topic) -> Option<CanonicalPaper> {
    let paper_id = raw.paper_id.filter(|id| !id.trim().is_empty())?;
    let title = raw
        .title
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())?;
    let published_date = raw.publication_date.as_deref().and_then(parse_iso_date)?;
    let abstract_text = raw
        .abstract_text
        .map(|a| collapse_whitespace(&a))
        .filter(|a| !a.is_empty())?;

    let url = raw
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("{}/{}", S2_PAPER_PAGE, paper_id.trim()));

    let authors = raw
        .authors
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .iter()
        .filter_map(|author| author.get("name").and_then(serde_json::Value::as_str))
        .map(collapse_whitespace)
        .filter(|name| !name.is_empty())
        .collect();

    Some(CanonicalPaper {
        title,
        published_date,
        abstract_text,
        url,
        source: SourceName::SemanticScholar,
        authors,
        topics: BTreeSet::from([topic.code.clone()]),
        topic_origin: TopicOrigin::Fallback,
    })
}
