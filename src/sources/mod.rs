//! Source adapters.
//!
//! Each adapter issues one read-only request per topic, converts the
//! source-specific payload into [`CanonicalPaper`]s, and filters them through
//! the shared [`DedupRegistry`]. Raw payload types never leave their adapter.

pub mod arxiv;
pub mod semanticscholar;

use crate::catalog::{Topic, TopicCatalog};
use crate::config::{PipelineConfig, USER_AGENT};
use crate::error::{PapersError, Result};
use crate::model::{CanonicalPaper, SourceName};
use crate::registry::DedupRegistry;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;

pub use arxiv::ArxivAdapter;
pub use semanticscholar::SemanticScholarAdapter;

/// Wait reported when a 429 carries no usable Retry-After header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Longest error body echoed into an `Api` error
const MAX_ERROR_BODY: usize = 200;

/// A source of papers for a topic.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> SourceName;

    /// Fetch and normalize the newest papers for `topic`.
    ///
    /// Transport and payload failures return an error and never a partial
    /// batch; individual malformed entries are skipped.
    async fn fetch(&self, topic: &Topic) -> Result<Vec<CanonicalPaper>>;
}

/// Build the HTTP client shared by every adapter and worker.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PapersError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Construct the adapters for the requested sources.
pub fn build_adapters(
    sources: &[SourceName],
    config: &PipelineConfig,
    client: &Client,
    registry: &Arc<DedupRegistry>,
    catalog: &Arc<TopicCatalog>,
) -> Vec<Arc<dyn SourceAdapter>> {
    sources
        .iter()
        .map(|source| -> Arc<dyn SourceAdapter> {
            match source {
                SourceName::Arxiv => Arc::new(
                    ArxivAdapter::new(
                        client.clone(),
                        Arc::clone(registry),
                        Arc::clone(catalog),
                        config.max_papers,
                    )
                    .with_base_url(&config.arxiv_base_url),
                ),
                SourceName::SemanticScholar => Arc::new(
                    SemanticScholarAdapter::new(client.clone(), Arc::clone(registry), config.max_papers)
                        .with_base_url(&config.s2_base_url)
                        .with_overfetch(config.overfetch)
                        .with_year(config.year.clone())
                        .with_api_key(config.s2_api_key.clone()),
                ),
            }
        })
        .collect()
}

/// Send a request and return the body of a successful response.
pub(crate) async fn fetch_text(request: RequestBuilder, source: SourceName) -> Result<String> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(PapersError::RateLimited(retry_after));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(PapersError::Api {
            code: status.as_u16() as i32,
            message: format!("{} API error: {} - {}", source, status, body.trim()),
        });
    }

    Ok(response.text().await?)
}

/// Collapse runs of whitespace (including the line breaks feeds put in titles).
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
