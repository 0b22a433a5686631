//! Search module: ranked, cached article search
//!
//! This module contains:
//! - The relevance query compiler (free text to engine request)
//! - The TTL-bounded result cache
//! - The search engine client and its read-side trait
//! - The search facade composing the three

pub mod cache;
pub mod compiler;
pub mod engine;
mod facade;

pub use cache::{CacheKey, CacheStats, ResultCache};
pub use compiler::{compile, compile_suggest, CompiledQuery};
pub use engine::{EngineClient, EngineError, SearchEngine};
pub use facade::{clamp_page, SearchError, SearchService, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::article::Article;
use serde::{Deserialize, Serialize};

/// One page of ranked search hits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Hits in engine rank order
    pub articles: Vec<Article>,

    /// Total number of matching articles across all pages
    pub total: u64,
}
