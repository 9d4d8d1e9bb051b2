//! Canonical record model shared by every source adapter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Length of an ISO `YYYY-MM-DD` date prefix
const ISO_DATE_LEN: usize = 10;

/// External source a paper was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceName {
    #[serde(rename = "arXiv.org")]
    Arxiv,
    #[serde(rename = "SemanticScholar.org")]
    SemanticScholar,
}

impl SourceName {
    pub const ALL: [SourceName; 2] = [SourceName::Arxiv, SourceName::SemanticScholar];

    /// Display name stored on every record
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Arxiv => "arXiv.org",
            SourceName::SemanticScholar => "SemanticScholar.org",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arxiv" | "arxiv.org" => Ok(SourceName::Arxiv),
            "semanticscholar" | "semanticscholar.org" | "s2" => Ok(SourceName::SemanticScholar),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// Where a record's `topics` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicOrigin {
    /// Catalog-recognized tags found in the raw payload
    Tagged,
    /// No recognized tag; topics hold only the requested code
    #[default]
    Fallback,
    /// Replaced by the classification hook
    Classified,
}

/// One normalized paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPaper {
    pub title: String,
    #[serde(rename = "date")]
    pub published_date: NaiveDate,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Canonical identifier and dedup key within its source
    pub url: String,
    pub source: SourceName,
    /// Source order
    pub authors: Vec<String>,
    /// Never empty
    pub topics: BTreeSet<String>,
    #[serde(skip)]
    pub topic_origin: TopicOrigin,
}

impl CanonicalPaper {
    /// True when the record should be routed through the classification hook.
    pub fn needs_classification(&self) -> bool {
        self.topic_origin == TopicOrigin::Fallback && !self.abstract_text.trim().is_empty()
    }

    pub fn has_topic(&self, code: &str) -> bool {
        self.topics.contains(code)
    }
}

/// Raw payload field that arrives either as one value or a list of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    Single(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::Single(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Parse the `YYYY-MM-DD` prefix of a date or timestamp string.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.trim().get(..ISO_DATE_LEN)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 18);
        assert_eq!(parse_iso_date("2023-03-18"), expected);
        assert_eq!(parse_iso_date("2023-03-18T17:59:59Z"), expected);
        assert_eq!(parse_iso_date("2023"), None);
        assert_eq!(parse_iso_date("2023-13-01"), None);
        assert_eq!(parse_iso_date(""), None);
    }

    #[test]
    fn test_source_name_parsing() {
        assert_eq!("arxiv".parse::<SourceName>(), Ok(SourceName::Arxiv));
        assert_eq!("SemanticScholar".parse::<SourceName>(), Ok(SourceName::SemanticScholar));
        assert!("pubmed".parse::<SourceName>().is_err());
        assert_eq!(SourceName::Arxiv.to_string(), "arXiv.org");
    }

    #[test]
    fn test_one_or_many() {
        let single: OneOrMany<serde_json::Value> =
            serde_json::from_str(r#"{"name": "Ada Lovelace"}"#).unwrap();
        assert_eq!(single.into_vec().len(), 1);

        let many: OneOrMany<serde_json::Value> =
            serde_json::from_str(r#"[{"name": "A"}, {"name": "B"}]"#).unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn test_paper_json_shape() {
        let paper = CanonicalPaper {
            title: "Query Planning".into(),
            published_date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            abstract_text: "We plan queries.".into(),
            url: "http://arxiv.org/abs/2301.00001v1".into(),
            source: SourceName::Arxiv,
            authors: vec!["E. F. Codd".into()],
            topics: BTreeSet::from(["DB".to_string()]),
            topic_origin: TopicOrigin::Tagged,
        };

        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["date"], "2023-01-02");
        assert_eq!(json["source"], "arXiv.org");
        assert_eq!(json["abstract"], "We plan queries.");
        assert!(json.get("topic_origin").is_none());

        let back: CanonicalPaper = serde_json::from_value(json).unwrap();
        assert_eq!(back.title, paper.title);
        assert!(back.has_topic("DB"));
    }

    #[test]
    fn test_needs_classification() {
        let mut paper = CanonicalPaper {
            title: "t".into(),
            published_date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            abstract_text: "   ".into(),
            url: "u".into(),
            source: SourceName::SemanticScholar,
            authors: Vec::new(),
            topics: BTreeSet::from(["AI".to_string()]),
            topic_origin: TopicOrigin::Fallback,
        };
        assert!(!paper.needs_classification());
        paper.abstract_text = "Agents that plan.".into();
        assert!(paper.needs_classification());
        paper.topic_origin = TopicOrigin::Tagged;
        assert!(!paper.needs_classification());
    }
}
