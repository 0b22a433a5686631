//! Fetch worker: one bounded attempt at one article page
//!
//! This module handles the network side of the crawl:
//! - Building the HTTP client with the crawler's timeout and headers
//! - A single GET per attempt, with transport failures classified
//! - Selecting and validating the title, body and timestamps among the
//!   candidates the extractor found
//!
//! Retrying is not done here; the coordinator drives attempts through the
//! retry policy.

use crate::article::{article_id_from_url, is_placeholder_title, Article};
use crate::config::CrawlerConfig;
use crate::crawler::extractor::{Extractor, PageCandidates};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Classification of a failed fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection failure, timeout, or non-success HTTP status
    Transport,

    /// No usable title among the candidates
    NoTitle,

    /// No non-empty body among the candidates
    NoBody,

    /// Malformed target; never retried
    Terminal,
}

impl FailureKind {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::NoTitle => "no title",
            Self::NoBody => "no body",
            Self::Terminal => "terminal",
        };
        write!(f, "{}", name)
    }
}

/// A failed fetch attempt with its underlying cause
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
    /// HTTP status code, when the server answered
    pub status: Option<u16>,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn http_status(status: u16) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: format!("HTTP {}", status),
            status: Some(status),
        }
    }
}

/// One bounded fetch attempt for a crawl target
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `target` once and returns a validated article
    async fn fetch(&self, target: &Url) -> Result<Article, FetchFailure>;
}

/// Builds the HTTP client used for article pages
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Parses a crawl target, rejecting anything that is not an HTTP(S) URL
///
/// Such targets can never succeed, so the failure is [`FailureKind::Terminal`].
pub fn parse_target(target: &str) -> Result<Url, FetchFailure> {
    let url = Url::parse(target.trim()).map_err(|e| {
        FetchFailure::new(
            FailureKind::Terminal,
            format!("malformed target '{}': {}", target, e),
        )
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchFailure::new(
            FailureKind::Terminal,
            format!("unsupported scheme '{}' in '{}'", scheme, target),
        )),
    }
}

/// Fetch worker backed by reqwest and an [`Extractor`]
pub struct HttpFetcher {
    client: Client,
    extractor: Arc<dyn Extractor>,
}

impl HttpFetcher {
    pub fn new(client: Client, extractor: Arc<dyn Extractor>) -> Self {
        Self { client, extractor }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, target: &Url) -> Result<Article, FetchFailure> {
        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::http_status(status.as_u16()));
        }

        let html = response.text().await.map_err(classify_transport_error)?;

        let candidates = self.extractor.extract(&html);
        build_article(target, candidates, Utc::now())
    }
}

/// Maps a reqwest error onto a transport failure with a readable cause
fn classify_transport_error(error: reqwest::Error) -> FetchFailure {
    let message = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };

    FetchFailure {
        kind: FailureKind::Transport,
        message,
        status: error.status().map(|s| s.as_u16()),
    }
}

/// Selects and validates the article fields among the extracted candidates
///
/// `now` stands in for both timestamps when the page carries none.
pub fn build_article(
    target: &Url,
    candidates: PageCandidates,
    now: DateTime<Utc>,
) -> Result<Article, FetchFailure> {
    let title = select_title(&candidates.titles).ok_or_else(|| {
        FetchFailure::new(FailureKind::NoTitle, "no meaningful title found on page")
    })?;

    let body = select_body(&candidates.bodies)
        .ok_or_else(|| FetchFailure::new(FailureKind::NoBody, "no content found on page"))?;

    let (created_at, updated_at) = select_timestamps(&candidates.timestamps).unwrap_or((now, now));

    Ok(Article {
        id: article_id_from_url(target.as_str()),
        title,
        body,
        url: target.to_string(),
        created_at,
        updated_at,
    })
}

/// First candidate that is non-empty and not a placeholder banner
fn select_title(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|title| title.trim())
        .find(|title| !title.is_empty() && !is_placeholder_title(title))
        .map(str::to_string)
}

/// First non-empty body candidate
fn select_body(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|body| !body.trim().is_empty())
        .cloned()
}

/// Created is the first parseable timestamp, updated the last
fn select_timestamps(candidates: &[String]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let parsed: Vec<DateTime<Utc>> = candidates
        .iter()
        .filter_map(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc))
        .collect();

    Some((*parsed.first()?, *parsed.last()?))
}
