//! One ingestion batch: fetch, classify, hand off to the store.

use crate::catalog::{Topic, TopicCatalog};
use crate::classify::{apply_labels, Classifier};
use crate::model::CanonicalPaper;
use crate::orchestrator::{FetchKey, FetchOrchestrator};
use crate::store::PaperStore;
use std::sync::Arc;
use tracing::{error, info};

/// What a batch produced
#[derive(Debug)]
pub struct IngestSummary {
    /// Papers merged from every source
    pub fetched: usize,
    /// Papers relabeled by the classifier
    pub classified: usize,
    pub failed_pairs: Vec<FetchKey>,
    /// False when the sink rejected the batch
    pub stored: bool,
    pub papers: Vec<CanonicalPaper>,
}

pub struct IngestPipeline {
    orchestrator: FetchOrchestrator,
    classifier: Option<Arc<dyn Classifier>>,
    catalog: Arc<TopicCatalog>,
    store: Arc<dyn PaperStore>,
}

impl IngestPipeline {
    pub fn new(
        orchestrator: FetchOrchestrator,
        catalog: Arc<TopicCatalog>,
        store: Arc<dyn PaperStore>,
    ) -> Self {
        Self {
            orchestrator,
            classifier: None,
            catalog,
            store,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Run one batch over `topics`.
    ///
    /// Source failures shrink the batch; a sink failure is logged and reported
    /// through `stored` without retry or rollback.
    pub async fn run(&self, topics: &[Topic]) -> IngestSummary {
        let report = self.orchestrator.run(topics).await;
        let failed_pairs: Vec<FetchKey> = report.failed_pairs().into_iter().cloned().collect();
        let mut papers = report.papers;

        let classified = match &self.classifier {
            Some(classifier) => apply_labels(&mut papers, classifier.as_ref(), &self.catalog).await,
            None => 0,
        };

        let stored = match self.store.replace_all(&papers).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, count = papers.len(), "Failed to store batch");
                false
            }
        };

        info!(
            fetched = papers.len(),
            classified = classified,
            failed_pairs = failed_pairs.len(),
            stored = stored,
            "Ingest batch complete"
        );

        IngestSummary {
            fetched: papers.len(),
            classified,
            failed_pairs,
            stored,
            papers,
        }
    }
}
