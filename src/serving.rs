//! Read path for topic queries.
//!
//! [`TopicService`] validates the topic code, answers from the recency cache
//! when it can, and otherwise runs one bounded store query and caches the
//! result.

use crate::cache::LruCache;
use crate::catalog::TopicCatalog;
use crate::config::ServeConfig;
use crate::error::Result;
use crate::model::CanonicalPaper;
use crate::store::PaperStore;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Result set shared between the cache and callers
pub type TopicPapers = Arc<Vec<CanonicalPaper>>;

pub struct TopicService {
    catalog: Arc<TopicCatalog>,
    store: Arc<dyn PaperStore>,
    cache: Mutex<LruCache<String, TopicPapers>>,
    limit: usize,
}

impl TopicService {
    pub fn new(catalog: Arc<TopicCatalog>, store: Arc<dyn PaperStore>, config: &ServeConfig) -> Self {
        Self {
            catalog,
            store,
            cache: Mutex::new(LruCache::new(config.cache_capacity)),
            limit: config.topic_limit,
        }
    }

    pub fn catalog(&self) -> &TopicCatalog {
        &self.catalog
    }

    /// Papers for `code`.
    ///
    /// Unknown codes fail with `UnknownTopic` before the cache or store is
    /// touched. Store errors are returned and leave the cache unchanged.
    pub async fn lookup_by_topic(&self, code: &str) -> Result<TopicPapers> {
        let topic = self.catalog.validate(code)?;
        let key = topic.code.clone();

        let cached = self.lock_cache().get(&key).cloned();
        if let Some(hit) = cached {
            debug!(topic = %key, count = hit.len(), "Cache hit");
            return Ok(hit);
        }

        let papers = Arc::new(self.store.find_by_topic(&key, self.limit).await?);
        info!(topic = %key, count = papers.len(), "Loaded topic from store");

        self.lock_cache().put(key, Arc::clone(&papers));
        Ok(papers)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, TopicPapers>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
