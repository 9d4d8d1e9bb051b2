//! Paper storage sink.
//!
//! Ingestion hands its whole batch to [`PaperStore::replace_all`]; the serving
//! path reads it back per topic. Writes replace the collection wholesale, never
//! upsert.

use crate::error::{PapersError, Result};
use crate::model::CanonicalPaper;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Replace-style document store
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Delete every stored paper, then insert `papers`.
    async fn replace_all(&self, papers: &[CanonicalPaper]) -> Result<()>;

    /// Papers tagged with `code`, newest first, at most `limit`.
    async fn find_by_topic(&self, code: &str, limit: usize) -> Result<Vec<CanonicalPaper>>;
}

fn select_topic(papers: &[CanonicalPaper], code: &str, limit: usize) -> Vec<CanonicalPaper> {
    let mut matched: Vec<CanonicalPaper> = papers
        .iter()
        .filter(|paper| paper.has_topic(code))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    matched.truncate(limit);
    matched
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    papers: RwLock<Vec<CanonicalPaper>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.papers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn replace_all(&self, papers: &[CanonicalPaper]) -> Result<()> {
        let mut stored = self.papers.write().unwrap_or_else(PoisonError::into_inner);
        *stored = papers.to_vec();
        Ok(())
    }

    async fn find_by_topic(&self, code: &str, limit: usize) -> Result<Vec<CanonicalPaper>> {
        let stored = self.papers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(select_topic(&stored, code, limit))
    }
}

/// Store backed by a single pretty-printed JSON array on disk
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<CanonicalPaper>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "Store file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PapersError::Store(format!("read {:?}: {}", self.path, e))),
        };

        serde_json::from_str(&content)
            .map_err(|e| PapersError::Store(format!("decode {:?}: {}", self.path, e)))
    }
}

#[async_trait]
impl PaperStore for JsonFileStore {
    async fn replace_all(&self, papers: &[CanonicalPaper]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PapersError::Store(format!("create {:?}: {}", parent, e)))?;
            }
        }

        let content = serde_json::to_string_pretty(papers)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| PapersError::Store(format!("write {:?}: {}", tmp, e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PapersError::Store(format!("rename {:?}: {}", tmp, e)))?;

        info!(path = ?self.path, count = papers.len(), "Replaced stored papers");
        Ok(())
    }

    async fn find_by_topic(&self, code: &str, limit: usize) -> Result<Vec<CanonicalPaper>> {
        let papers = self.load().await?;
        Ok(select_topic(&papers, code, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SourceName, TopicOrigin};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn paper(url: &str, day: u32, topics: &[&str]) -> CanonicalPaper {
        CanonicalPaper {
            title: format!("Paper {}", url),
            published_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            abstract_text: "text".into(),
            url: url.into(),
            source: SourceName::Arxiv,
            authors: vec!["Ada Lovelace".into()],
            topics: topics.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            topic_origin: TopicOrigin::Tagged,
        }
    }

    #[tokio::test]
    async fn test_memory_store_replaces() {
        let store = MemoryStore::new();
        store
            .replace_all(&[paper("a", 1, &["AI"]), paper("b", 2, &["DB"])])
            .await
            .unwrap();
        store.replace_all(&[paper("c", 3, &["AI"])]).await.unwrap();

        assert_eq!(store.len(), 1);
        let found = store.find_by_topic("AI", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "c");
        assert!(store.find_by_topic("DB", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_newest_first_with_limit() {
        let store = MemoryStore::new();
        store
            .replace_all(&[
                paper("old", 1, &["AI", "LG"]),
                paper("new", 20, &["AI"]),
                paper("mid", 10, &["LG", "AI"]),
                paper("other", 30, &["CV"]),
            ])
            .await
            .unwrap();

        let found = store.find_by_topic("AI", 2).await.unwrap();
        let urls: Vec<&str> = found.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("papers.json"));

        assert!(store.find_by_topic("AI", 5).await.unwrap().is_empty());

        store
            .replace_all(&[paper("a", 1, &["AI"]), paper("b", 2, &["AI", "CL"])])
            .await
            .unwrap();
        let found = store.find_by_topic("AI", 5).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url, "b");
        assert_eq!(found[0].published_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"date\": \"2024-03-02\""));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.find_by_topic("AI", 5).await.unwrap_err();
        assert!(matches!(err, PapersError::Store(_)));
    }
}
