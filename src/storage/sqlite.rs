//! SQLite article store
//!
//! This module provides a SQLite-based implementation of [`ArticleStore`],
//! also usable as a crawl [`ArticleSink`].

use crate::article::Article;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleSink, ArticleStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::DocsearchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite storage backend
///
/// The connection sits behind a mutex so the store can be shared with the
/// crawl's sink list.
pub struct SqliteArticleStore {
    conn: Mutex<Connection>,
}

impl SqliteArticleStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteArticleStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp '{}': {}", value, e)))
}

type ArticleRow = (String, String, String, String, String, String);

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<ArticleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        succeeded: row.get(5)?,
        failed: row.get(6)?,
    })
}

impl ArticleStore for SqliteArticleStore {
    // ===== Articles =====

    fn upsert_article(&self, article: &Article) -> StorageResult<()> {
        self.conn().execute(
            "INSERT INTO articles (id, title, body, url, created_at, updated_at, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                url = excluded.url,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                indexed_at = excluded.indexed_at",
            params![
                article.id,
                article.title,
                article.body,
                article.url,
                article.created_at.to_rfc3339(),
                article.updated_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_article(&self, id: &str) -> StorageResult<Option<Article>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, body, url, created_at, updated_at FROM articles WHERE id = ?1",
        )?;

        let Some((id, title, body, url, created_at, updated_at)) =
            stmt.query_row(params![id], row_to_article).optional()?
        else {
            return Ok(None);
        };

        Ok(Some(Article {
            id,
            title,
            body,
            url,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                Utc::now().to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        succeeded: i64,
        failed: i64,
    ) -> StorageResult<()> {
        let updated = self.conn().execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, succeeded = ?3, failed = ?4
             WHERE id = ?5",
            params![
                Utc::now().to_rfc3339(),
                status.to_db_string(),
                succeeded,
                failed,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, succeeded, failed
             FROM runs WHERE id = ?1",
        )?;

        stmt.query_row(params![run_id], row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, succeeded, failed
             FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        Ok(stmt.query_row([], row_to_run).optional()?)
    }
}

#[async_trait]
impl ArticleSink for SqliteArticleStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store(&self, article: &Article) -> Result<(), DocsearchError> {
        self.upsert_article(article)?;
        Ok(())
    }
}
