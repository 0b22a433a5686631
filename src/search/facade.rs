//! Search facade
//!
//! The only path from a caller's query to the search engine: cache lookup,
//! then compile, one engine call, and cache population. Engine failures are
//! returned to the caller and never cached.

use crate::search::cache::{CacheKey, CacheStats, ResultCache};
use crate::search::compiler::{compile, compile_suggest, SUGGESTION_LIMIT};
use crate::search::engine::{EngineError, SearchEngine};
use crate::search::SearchResult;
use thiserror::Error;

/// Page size used when a caller asks for none or too many
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: usize = 50;

/// Shortest prefix autocomplete answers for
pub const MIN_SUGGEST_PREFIX: usize = 2;

/// Errors returned by [`SearchService`]
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("query must not be empty")]
    EmptyQuery,
}

/// Normalizes caller paging: a size of zero or above [`MAX_PAGE_SIZE`]
/// becomes [`DEFAULT_PAGE_SIZE`]
pub fn clamp_page(from: usize, size: usize) -> (usize, usize) {
    let size = if size == 0 || size > MAX_PAGE_SIZE {
        DEFAULT_PAGE_SIZE
    } else {
        size
    };
    (from, size)
}

/// Cached search over a [`SearchEngine`]
pub struct SearchService<E> {
    engine: E,
    cache: ResultCache,
}

impl<E: SearchEngine> SearchService<E> {
    pub fn new(engine: E, cache: ResultCache) -> Self {
        Self { engine, cache }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns one page of ranked results for `query`
    ///
    /// # Arguments
    ///
    /// * `query` - The user's query; wrap in double quotes for a phrase search
    /// * `offset` - Index of the first hit to return
    /// * `limit` - Page size, passed to the engine verbatim
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResult)` - From the cache, or fresh from the engine
    /// * `Err(SearchError)` - Empty query, or the engine call failed
    pub async fn search(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResult, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let key = CacheKey::new(query, offset, limit);
        if let Some(result) = self.cache.lookup(&key) {
            tracing::debug!("Cache hit for '{}' (from {}, size {})", query, offset, limit);
            return Ok(result);
        }

        let compiled = compile(query, offset, limit);
        let result = self.engine.search(&compiled).await.map_err(|e| {
            tracing::warn!("Search for '{}' failed: {}", query, e);
            e
        })?;

        tracing::debug!(
            "Search for '{}' returned {} of {} hits",
            query,
            result.articles.len(),
            result.total
        );

        self.cache.store(key, result.clone());
        Ok(result)
    }

    /// Returns up to five article titles containing `prefix`
    ///
    /// Prefixes shorter than two characters yield no suggestions without
    /// calling the engine. Suggestions are not cached.
    pub async fn suggest(&self, prefix: &str) -> Result<Vec<String>, SearchError> {
        let prefix = prefix.trim();
        if prefix.chars().count() < MIN_SUGGEST_PREFIX {
            return Ok(Vec::new());
        }

        let titles = self.engine.suggest(&compile_suggest(prefix)).await?;

        let needle = prefix.to_lowercase();
        Ok(titles
            .into_iter()
            .filter(|title| title.to_lowercase().contains(&needle))
            .take(SUGGESTION_LIMIT)
            .collect())
    }
}
