//! Deduplication registry.
//!
//! Per source, the set of paper identifiers already emitted. The registry is
//! append-only for the life of a run; resetting means building a new one at a
//! batch boundary. A snapshot can be persisted between runs so repeated
//! ingests keep skipping papers that were already delivered.

use crate::error::{PapersError, Result};
use crate::model::SourceName;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Serialized form of a registry: source -> seen identifiers
pub type RegistrySnapshot = BTreeMap<SourceName, BTreeSet<String>>;

/// Append-only acceptance filter, one independently locked set per source.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    arxiv: Mutex<HashSet<String>>,
    semantic_scholar: Mutex<HashSet<String>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a persisted snapshot.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let registry = Self::new();
        for (source, ids) in snapshot {
            registry.ids(source).extend(ids);
        }
        registry
    }

    fn ids(&self, source: SourceName) -> MutexGuard<'_, HashSet<String>> {
        let set = match source {
            SourceName::Arxiv => &self.arxiv,
            SourceName::SemanticScholar => &self.semantic_scholar,
        };
        set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `id` was already emitted by `source`.
    pub fn seen(&self, source: SourceName, id: &str) -> bool {
        self.ids(source).contains(id)
    }

    pub fn mark_seen(&self, source: SourceName, id: &str) {
        self.ids(source).insert(id.to_string());
    }

    /// Atomically test and mark `id`.
    ///
    /// Returns `true` when the id was unseen and has now been accepted, `false`
    /// when it is a duplicate. Concurrent fetches of the same source cannot both
    /// accept the same id.
    pub fn check_and_mark(&self, source: SourceName, id: &str) -> bool {
        let mut ids = self.ids(source);
        if ids.contains(id) {
            return false;
        }
        ids.insert(id.to_string())
    }

    pub fn len(&self, source: SourceName) -> usize {
        self.ids(source).len()
    }

    pub fn is_empty(&self) -> bool {
        SourceName::ALL.iter().all(|s| self.ids(*s).is_empty())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        SourceName::ALL
            .iter()
            .map(|source| (*source, self.ids(*source).iter().cloned().collect()))
            .collect()
    }
}

/// Default snapshot path: `~/.rustpapers/seen.json`
pub fn default_state_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".rustpapers").join("seen.json"))
        .ok_or_else(|| PapersError::Config("Cannot determine home directory".to_string()))
}

/// JSON file holding a registry snapshot between runs
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry.
    ///
    /// A missing or unreadable file starts an empty registry.
    pub fn load(&self) -> DedupRegistry {
        if !self.path.exists() {
            debug!(path = ?self.path, "No registry snapshot, starting empty");
            return DedupRegistry::new();
        }

        let snapshot = std::fs::read_to_string(&self.path)
            .map_err(PapersError::from)
            .and_then(|content| Ok(serde_json::from_str::<RegistrySnapshot>(&content)?));

        match snapshot {
            Ok(snapshot) => {
                let registry = DedupRegistry::from_snapshot(snapshot);
                info!(
                    path = ?self.path,
                    arxiv = registry.len(SourceName::Arxiv),
                    semantic_scholar = registry.len(SourceName::SemanticScholar),
                    "Loaded registry snapshot"
                );
                registry
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Ignoring unreadable registry snapshot");
                DedupRegistry::new()
            }
        }
    }

    pub fn save(&self, registry: &DedupRegistry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&registry.snapshot())?;
        std::fs::write(&self.path, content)?;
        info!(path = ?self.path, "Saved registry snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_check_and_mark() {
        let registry = DedupRegistry::new();
        assert!(registry.check_and_mark(SourceName::Arxiv, "http://arxiv.org/abs/1"));
        assert!(!registry.check_and_mark(SourceName::Arxiv, "http://arxiv.org/abs/1"));
        assert!(registry.seen(SourceName::Arxiv, "http://arxiv.org/abs/1"));
        // sources are independent
        assert!(!registry.seen(SourceName::SemanticScholar, "http://arxiv.org/abs/1"));
        assert!(registry.check_and_mark(SourceName::SemanticScholar, "http://arxiv.org/abs/1"));
    }

    #[test]
    fn test_mark_seen() {
        let registry = DedupRegistry::new();
        assert!(registry.is_empty());
        registry.mark_seen(SourceName::SemanticScholar, "p1");
        registry.mark_seen(SourceName::SemanticScholar, "p1");
        assert_eq!(registry.len(SourceName::SemanticScholar), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_concurrent_check_and_mark_accepts_once() {
        let registry = Arc::new(DedupRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| registry.check_and_mark(SourceName::Arxiv, &i.to_string()))
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 100);
        assert_eq!(registry.len(SourceName::Arxiv), 100);
    }

    #[test]
    fn test_load_missing() {
        let file = RegistryFile::with_path(PathBuf::from("/nonexistent/seen.json"));
        assert!(file.load().is_empty());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = RegistryFile::with_path(dir.path().join("state").join("seen.json"));

        let registry = DedupRegistry::new();
        registry.mark_seen(SourceName::Arxiv, "a");
        registry.mark_seen(SourceName::SemanticScholar, "b");
        file.save(&registry)?;

        let loaded = file.load();
        assert!(loaded.seen(SourceName::Arxiv, "a"));
        assert!(loaded.seen(SourceName::SemanticScholar, "b"));
        assert!(!loaded.seen(SourceName::Arxiv, "b"));
        Ok(())
    }

    #[test]
    fn test_load_corrupt_starts_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "not json")?;
        assert!(RegistryFile::with_path(path).load().is_empty());
        Ok(())
    }
}
