//! Article records produced by the crawler and returned by search
//!
//! An [`Article`] is the unit that flows from the fetch workers into the
//! search index and back out of it as a ranked hit. The serialized field
//! names match the engine document mapping.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Titles that documentation sites render on every page and that never
/// identify an article.
pub const PLACEHOLDER_TITLES: &[&str] = &["How can we help?", "Knowledge Base"];

/// A validated documentation article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable article identifier (numeric id from the URL when present)
    pub id: String,

    /// Article title, never empty and never a placeholder
    pub title: String,

    /// Article body as cleaned HTML, never empty
    pub body: String,

    /// Canonical article URL
    pub url: String,

    /// When the article was first published
    pub created_at: DateTime<Utc>,

    /// When the article was last updated
    pub updated_at: DateTime<Utc>,
}

/// Returns true if `title` is one of the known placeholder banners
pub fn is_placeholder_title(title: &str) -> bool {
    PLACEHOLDER_TITLES.contains(&title)
}

fn article_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/articles/(\d+)").expect("article id regex is valid"))
}

/// Derives an article id from its URL
///
/// Help-center URLs carry a numeric id (`/articles/360001234-Some-Title`);
/// that id is used when present so re-crawls upsert the same document.
/// Any other URL gets a SHA-256 fingerprint of the full URL.
///
/// # Example
///
/// ```
/// use docsearch::article::article_id_from_url;
///
/// let id = article_id_from_url("https://help.example.com/hc/en-us/articles/42-Intro");
/// assert_eq!(id, "42");
/// ```
pub fn article_id_from_url(url: &str) -> String {
    if let Some(captures) = article_id_regex().captures(url) {
        return captures[1].to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
