//! Topic catalog.
//!
//! The fixed set of arXiv computer-science subject codes the feed is organised
//! around. Every fetch request and every cache key is validated against it.

use crate::error::{PapersError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// arXiv category prefix for computer-science subjects
const ARXIV_CS_PREFIX: &str = "cs.";

/// Code and search name of every computer-science subject
const CS_TOPICS: &[(&str, &str)] = &[
    ("AI", "Artificial Intelligence"),
    ("CL", "Computation and Language"),
    ("CC", "Computational Complexity"),
    ("CE", "Computational Engineering, Finance, and Science"),
    ("CG", "Computational Geometry"),
    ("CV", "Computer Vision and Pattern Recognition"),
    ("CY", "Computers and Society"),
    ("CR", "Cryptography and Security"),
    ("DS", "Data Structures and Algorithms"),
    ("DB", "Databases"),
    ("DL", "Digital Libraries"),
    ("DM", "Discrete Mathematics"),
    ("DC", "Distributed, Parallel, and Cluster Computing"),
    ("ET", "Emerging Technologies"),
    ("FL", "Formal Languages and Automata Theory"),
    ("GT", "Game Theory"),
    ("GL", "General Literature"),
    ("GR", "Graphics"),
    ("AR", "Hardware Architecture"),
    ("HC", "Human-Computer Interaction"),
    ("IR", "Information Retrieval"),
    ("IT", "Information Theory"),
    ("LO", "Logic in Computer Science"),
    ("LG", "Machine Learning"),
    ("MS", "Mathematical Software"),
    ("MA", "Multiagent Systems"),
    ("MM", "Multimedia"),
    ("NI", "Networking and Internet Architecture"),
    ("NE", "Neural and Evolutionary Computing"),
    ("NA", "Numerical Analysis"),
    ("OS", "Operating Systems"),
    ("OH", "Other"),
    ("PF", "Performance"),
    ("PL", "Programming Languages"),
    ("RO", "Robotics"),
    ("SI", "Social and Information Networks"),
    ("SE", "Software Engineering"),
    ("SD", "Sound"),
    ("SC", "Symbolic Computation"),
    ("SY", "Systems and Control"),
];

/// A single catalog topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    /// Short code, e.g. "AI"
    pub code: String,
    /// Human-readable name, also used as the search term
    pub name: String,
}

/// Immutable mapping from topic code to topic
#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: BTreeMap<String, Topic>,
}

impl TopicCatalog {
    /// The standard computer-science catalog.
    pub fn standard() -> Self {
        Self::from_pairs(CS_TOPICS.iter().copied())
    }

    /// Build a catalog from `(code, name)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let topics = pairs
            .into_iter()
            .map(|(code, name)| {
                (
                    code.to_string(),
                    Topic {
                        code: code.to_string(),
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        Self { topics }
    }

    pub fn get(&self, code: &str) -> Option<&Topic> {
        self.topics.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.topics.contains_key(code)
    }

    /// Look up a topic, rejecting codes outside the catalog.
    pub fn validate(&self, code: &str) -> Result<&Topic> {
        self.get(code)
            .ok_or_else(|| PapersError::UnknownTopic(code.to_string()))
    }

    /// Map an arXiv category term ("cs.DB") to a catalog topic.
    pub fn from_arxiv_category(&self, term: &str) -> Option<&Topic> {
        term.strip_prefix(ARXIV_CS_PREFIX)
            .and_then(|code| self.get(code))
    }

    /// Restrict a run to the given codes. Fails on the first unknown code.
    pub fn subset<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<Topic>> {
        codes
            .iter()
            .map(|code| self.validate(code.as_ref().trim()).cloned())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl Default for TopicCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
