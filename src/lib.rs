//! docsearch: documentation crawler and cached relevance search
//!
//! This crate crawls a documentation site into validated [`Article`] records
//! under a hard concurrency ceiling with per-page retry, and serves ranked
//! search results from an external Elasticsearch-compatible engine through a
//! time-bounded result cache.

pub mod article;
pub mod config;
pub mod crawler;
pub mod output;
pub mod search;
pub mod storage;

use thiserror::Error;

/// Main error type for docsearch operations
#[derive(Debug, Error)]
pub enum DocsearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search engine error: {0}")]
    Engine(#[from] search::EngineError),

    #[error("Search error: {0}")]
    Search(#[from] search::SearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Sitemap error for {url}: {message}")]
    Sitemap { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// Result type alias for docsearch operations
pub type Result<T> = std::result::Result<T, DocsearchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use article::Article;
pub use config::Config;
pub use crawler::{crawl, CrawlStream, FailureKind, FetchOutcome, RetryPolicy};
pub use search::{SearchResult, SearchService};
