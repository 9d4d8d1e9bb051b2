//! Runtime configuration for ingestion and serving.
//!
//! Values come from the CLI (see `main.rs`); the defaults below match a
//! standard nightly ingest of every catalog topic.

use crate::error::{PapersError, Result};
use crate::sources::{arxiv::ARXIV_API_BASE, semanticscholar::S2_API_BASE};
use std::time::Duration;

/// Concurrent (topic, source) fetches
pub const DEFAULT_WORKERS: usize = 10;

/// Papers kept per (topic, source) pair
pub const DEFAULT_MAX_PAPERS: usize = 25;

/// Extra Semantic Scholar candidates requested beyond `max_papers`
pub const DEFAULT_OVERFETCH: usize = 50;

/// Per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Topic result sets held by the serving cache
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Papers returned per topic lookup
pub const DEFAULT_TOPIC_LIMIT: usize = 25;

/// User agent for every outbound request
pub const USER_AGENT: &str = concat!("rustpapers/", env!("CARGO_PKG_VERSION"));

/// Ingestion settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub max_papers: usize,
    pub overfetch: usize,
    pub request_timeout: Duration,
    /// Semantic Scholar `year` filter, e.g. "2024" or "2023-"
    pub year: Option<String>,
    pub s2_api_key: Option<String>,
    pub arxiv_base_url: String,
    pub s2_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_papers: DEFAULT_MAX_PAPERS,
            overfetch: DEFAULT_OVERFETCH,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            year: None,
            s2_api_key: None,
            arxiv_base_url: ARXIV_API_BASE.to_string(),
            s2_base_url: S2_API_BASE.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PapersError::Config("workers must be at least 1".to_string()));
        }
        if self.max_papers == 0 {
            return Err(PapersError::Config("max_papers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Serving-path settings
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub cache_capacity: usize,
    pub topic_limit: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            topic_limit: DEFAULT_TOPIC_LIMIT,
        }
    }
}

impl ServeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(PapersError::Config("cache capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}
