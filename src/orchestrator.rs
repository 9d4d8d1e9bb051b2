//! Fetch orchestrator.
//!
//! Fans one unit of work out per `(topic, source)` pair over a fixed number of
//! workers, then fans the results back in. Every unit is keyed by its pair, so
//! results never depend on completion order, and a failing or panicking unit
//! only costs its own pair's results.

use crate::catalog::Topic;
use crate::model::{CanonicalPaper, SourceName};
use crate::sources::SourceAdapter;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of one unit of work
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchKey {
    pub topic: String,
    pub source: SourceName,
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.topic, self.source)
    }
}

/// What a unit of work produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Number of papers contributed
    Fetched(usize),
    /// Error message; the pair contributed nothing
    Failed(String),
}

/// Merged output of one orchestrator run
#[derive(Debug, Default)]
pub struct FetchReport {
    pub papers: Vec<CanonicalPaper>,
    pub outcomes: BTreeMap<FetchKey, FetchOutcome>,
}

impl FetchReport {
    pub fn failed_pairs(&self) -> Vec<&FetchKey> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FetchOutcome::Failed(_)))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed_pairs().len()
    }
}

/// Bounded fan-out over every `(topic, source)` pair
pub struct FetchOrchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    workers: usize,
}

impl FetchOrchestrator {
    /// Adapters are keyed by source name; a second adapter for the same source
    /// is ignored.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, workers: usize) -> Self {
        let mut names = BTreeSet::new();
        let adapters = adapters
            .into_iter()
            .filter(|adapter| names.insert(adapter.name()))
            .collect();

        Self {
            adapters,
            workers: workers.max(1),
        }
    }

    pub fn sources(&self) -> Vec<SourceName> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Fetch every pair and merge the results.
    ///
    /// Waits for all units; never fails as a whole.
    pub async fn run(&self, topics: &[Topic]) -> FetchReport {
        let topics: BTreeMap<&str, &Topic> = topics.iter().map(|t| (t.code.as_str(), t)).collect();

        let units: Vec<(FetchKey, Topic, Arc<dyn SourceAdapter>)> = topics
            .values()
            .flat_map(|topic| {
                self.adapters.iter().map(move |adapter| {
                    (
                        FetchKey {
                            topic: topic.code.clone(),
                            source: adapter.name(),
                        },
                        (*topic).clone(),
                        Arc::clone(adapter),
                    )
                })
            })
            .collect();

        info!(
            pairs = units.len(),
            workers = self.workers,
            "Starting fetch fan-out"
        );

        let results: BTreeMap<FetchKey, Result<Vec<CanonicalPaper>, String>> = stream::iter(units)
            .map(|(key, topic, adapter)| async move {
                debug!(pair = %key, "Dispatching fetch");
                let handle = tokio::spawn(async move { adapter.fetch(&topic).await });
                let result = match handle.await {
                    Ok(Ok(papers)) => Ok(papers),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("worker aborted: {}", e)),
                };
                (key, result)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut report = FetchReport::default();
        for (key, result) in results {
            match result {
                Ok(papers) => {
                    debug!(pair = %key, count = papers.len(), "Fetch complete");
                    report.outcomes.insert(key, FetchOutcome::Fetched(papers.len()));
                    report.papers.extend(papers);
                }
                Err(e) => {
                    warn!(topic = %key.topic, source = %key.source, error = %e, "Fetch failed");
                    report.outcomes.insert(key, FetchOutcome::Failed(e));
                }
            }
        }

        info!(
            papers = report.papers.len(),
            succeeded = report.succeeded(),
            failed = report.failed_pairs().len(),
            "Fetch fan-out complete"
        );

        report
    }
}
