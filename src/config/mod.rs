//! Configuration module for docsearch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use docsearch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docsearch.toml")).unwrap();
//! println!("Crawler concurrency: {}", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, CrawlerConfig, OutputConfig, SearchEngineConfig, SitemapConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
