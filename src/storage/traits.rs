//! Storage traits and error types
//!
//! This module defines the interface crawled articles are written through
//! and the local article store interface, plus their error types.

use crate::article::Article;
use crate::storage::{RunRecord, RunStatus};
use crate::DocsearchError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for articles as the crawl produces them
///
/// The crawl calls [`ArticleSink::store`] once per fetched article. A failing
/// sink is logged and counted; it never stops the crawl.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Stores or replaces `article`, keyed by its id
    async fn store(&self, article: &Article) -> Result<(), DocsearchError>;
}

#[async_trait]
impl<T: ArticleSink + ?Sized> ArticleSink for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn store(&self, article: &Article) -> Result<(), DocsearchError> {
        (**self).store(article).await
    }
}

/// Local article store with crawl run bookkeeping
pub trait ArticleStore {
    // ===== Articles =====

    /// Inserts `article` or replaces the stored article with the same id
    fn upsert_article(&self, article: &Article) -> StorageResult<()>;

    /// Gets an article by id
    fn get_article(&self, id: &str) -> StorageResult<Option<Article>>;

    /// Number of stored articles
    fn count_articles(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as finished with its final status and counts
    fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        succeeded: i64,
        failed: i64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
