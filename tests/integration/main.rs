//! Integration tests for docsearch
//!
//! Each module drives the public API against wiremock servers standing in
//! for the documentation site and the search engine.

mod crawl_tests;
mod search_tests;
