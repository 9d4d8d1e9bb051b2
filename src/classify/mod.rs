//! Classification hook.
//!
//! Records that arrive without a catalog-recognized tag carry only the topic
//! they were fetched for. When a classifier is configured, their abstracts are
//! labeled in one batch and the predicted set replaces that fallback.

pub mod llm;

use crate::catalog::TopicCatalog;
use crate::error::Result;
use crate::model::{CanonicalPaper, TopicOrigin};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub use llm::{LlmClassifier, LlmConfig};

/// Catch-all topic never predicted from text
const CATCH_ALL_TOPIC: &str = "OH";

/// Assigns topic codes to free-text abstracts.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// One label set per abstract, positionally aligned with the input.
    async fn classify(&self, abstracts: &[String]) -> Result<Vec<BTreeSet<String>>>;
}

/// Route untagged records through `classifier` and replace their topics.
///
/// Only records with fallback topics and a non-empty abstract are sent.
/// Predicted labels outside the catalog are dropped; an empty prediction keeps
/// the fallback so `topics` is never empty. Classifier failures are logged and
/// leave every record untouched. Returns the number of records relabeled.
pub async fn apply_labels(
    papers: &mut [CanonicalPaper],
    classifier: &dyn Classifier,
    catalog: &TopicCatalog,
) -> usize {
    let routed: Vec<usize> = papers
        .iter()
        .enumerate()
        .filter(|(_, paper)| paper.needs_classification())
        .map(|(index, _)| index)
        .collect();

    if routed.is_empty() {
        return 0;
    }

    let abstracts: Vec<String> = routed
        .iter()
        .map(|index| papers[*index].abstract_text.clone())
        .collect();

    info!(count = abstracts.len(), "Classifying untagged abstracts");

    let labels = match classifier.classify(&abstracts).await {
        Ok(labels) if labels.len() == routed.len() => labels,
        Ok(labels) => {
            warn!(
                expected = routed.len(),
                received = labels.len(),
                "Classifier reply misaligned, keeping fallback topics"
            );
            return 0;
        }
        Err(e) => {
            warn!(error = %e, "Classifier failed, keeping fallback topics");
            return 0;
        }
    };

    let mut relabeled = 0;
    for (index, predicted) in routed.into_iter().zip(labels) {
        let topics: BTreeSet<String> = predicted
            .into_iter()
            .filter(|code| catalog.contains(code))
            .collect();

        let paper = &mut papers[index];
        if topics.is_empty() {
            debug!(url = %paper.url, "No labels predicted, keeping fallback");
            continue;
        }
        paper.topics = topics;
        paper.topic_origin = TopicOrigin::Classified;
        relabeled += 1;
    }

    info!(relabeled = relabeled, "Classification applied");
    relabeled
}

/// Offline classifier matching catalog topic names inside abstracts.
pub struct KeywordClassifier {
    patterns: Vec<(String, Regex)>,
}

impl KeywordClassifier {
    pub fn new(catalog: &TopicCatalog) -> Self {
        let patterns = catalog
            .iter()
            .filter(|topic| topic.code != CATCH_ALL_TOPIC)
            .filter_map(|topic| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(&topic.name));
                Regex::new(&pattern).ok().map(|re| (topic.code.clone(), re))
            })
            .collect();
        Self { patterns }
    }

    fn labels(&self, text: &str) -> BTreeSet<String> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(code, _)| code.clone())
            .collect()
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, abstracts: &[String]) -> Result<Vec<BTreeSet<String>>> {
        Ok(abstracts.iter().map(|text| self.labels(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PapersError;
    use crate::model::SourceName;
    use chrono::NaiveDate;

    struct FixedClassifier(Vec<BTreeSet<String>>);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _abstracts: &[String]) -> Result<Vec<BTreeSet<String>>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl Classifier for BrokenClassifier {
        async fn classify(&self, _abstracts: &[String]) -> Result<Vec<BTreeSet<String>>> {
            Err(PapersError::Classifier("model not loaded".into()))
        }
    }

    fn paper(url: &str, abstract_text: &str, origin: TopicOrigin) -> CanonicalPaper {
        CanonicalPaper {
            title: url.to_uppercase(),
            published_date: NaiveDate::from_ymd_opt(2023, 2, 25).unwrap(),
            abstract_text: abstract_text.into(),
            url: url.into(),
            source: SourceName::SemanticScholar,
            authors: Vec::new(),
            topics: BTreeSet::from(["AI".to_string()]),
            topic_origin: origin,
        }
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_labels_replace_fallback() {
        let catalog = TopicCatalog::standard();
        let mut papers = vec![
            paper("a", "vision transformers", TopicOrigin::Fallback),
            paper("b", "already tagged", TopicOrigin::Tagged),
            paper("c", "", TopicOrigin::Fallback),
            paper("d", "graph databases", TopicOrigin::Fallback),
        ];
        // only a and d are routed, in that order
        let classifier = FixedClassifier(vec![set(&["CV", "LG"]), set(&["DB", "ZZ"])]);

        let relabeled = apply_labels(&mut papers, &classifier, &catalog).await;

        assert_eq!(relabeled, 2);
        assert_eq!(papers[0].topics, set(&["CV", "LG"]));
        assert_eq!(papers[0].topic_origin, TopicOrigin::Classified);
        assert_eq!(papers[1].topics, set(&["AI"]));
        assert_eq!(papers[2].topics, set(&["AI"]));
        // replaced, never merged with the fallback; unknown labels dropped
        assert_eq!(papers[3].topics, set(&["DB"]));
    }

    #[tokio::test]
    async fn test_empty_prediction_keeps_fallback() {
        let catalog = TopicCatalog::standard();
        let mut papers = vec![paper("a", "something", TopicOrigin::Fallback)];
        let classifier = FixedClassifier(vec![set(&["nope"])]);

        assert_eq!(apply_labels(&mut papers, &classifier, &catalog).await, 0);
        assert_eq!(papers[0].topics, set(&["AI"]));
        assert_eq!(papers[0].topic_origin, TopicOrigin::Fallback);
    }

    #[tokio::test]
    async fn test_failures_keep_fallback() {
        let catalog = TopicCatalog::standard();
        let mut papers = vec![
            paper("a", "x", TopicOrigin::Fallback),
            paper("b", "y", TopicOrigin::Fallback),
        ];

        assert_eq!(apply_labels(&mut papers, &BrokenClassifier, &catalog).await, 0);

        let short = FixedClassifier(vec![set(&["DB"])]);
        assert_eq!(apply_labels(&mut papers, &short, &catalog).await, 0);
        assert!(papers.iter().all(|p| p.topics == set(&["AI"])));
    }

    #[tokio::test]
    async fn test_keyword_classifier() {
        let classifier = KeywordClassifier::new(&TopicCatalog::standard());
        let labels = classifier
            .classify(&[
                "Advances in machine learning for Robotics.".to_string(),
                "Nothing to see here, other than this.".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0], set(&["LG", "RO"]));
        assert!(labels[1].is_empty());
    }
}
