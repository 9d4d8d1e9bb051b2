//! # rustpapers
//!
//! Research-paper ingestion and serving - Rust Microservice
//!
//! ## Modules
//!
//! - [`sources`] - arXiv and Semantic Scholar adapters
//! - [`registry`] - Per-source deduplication across fetch cycles
//! - [`recency`] - Bounded top-K-by-date selection
//! - [`orchestrator`] - Concurrent `(topic, source)` fan-out
//! - [`classify`] - Topic labeling for untagged papers
//! - [`store`] - Replace-style paper storage
//! - [`serving`] - Topic lookups behind an LRU cache
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustpapers::{
//!     catalog::TopicCatalog, config::PipelineConfig, orchestrator::FetchOrchestrator,
//!     model::SourceName, registry::DedupRegistry, sources,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::default();
//!     let catalog = Arc::new(TopicCatalog::standard());
//!     let registry = Arc::new(DedupRegistry::new());
//!     let client = sources::build_client(config.request_timeout)?;
//!     let adapters = sources::build_adapters(&SourceName::ALL, &config, &client, &registry, &catalog);
//!
//!     let report = FetchOrchestrator::new(adapters, config.workers)
//!         .run(&catalog.subset(&["AI", "LG"])?)
//!         .await;
//!     println!("Fetched {} papers", report.papers.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod recency;
pub mod registry;
pub mod serving;
pub mod sources;
pub mod store;

pub use error::{PapersError, Result};
