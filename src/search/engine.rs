//! Elasticsearch-compatible engine client
//!
//! The engine is reached over its JSON/HTTP contract:
//! - `POST {url}/{index}/_search` for search and autocomplete
//! - `HEAD` / `PUT {url}/{index}` to create the index with its mapping
//! - `PUT {url}/{index}/_doc/{id}` to upsert an article
//!
//! Every request carries the configured timeout and, when configured, basic
//! auth credentials. Nothing here retries.

use crate::article::Article;
use crate::config::SearchEngineConfig;
use crate::search::compiler::CompiledQuery;
use crate::search::SearchResult;
use crate::storage::ArticleSink;
use crate::DocsearchError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors talking to the search engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode engine response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read side of the search engine
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Runs a compiled search and returns the ranked page with the total count
    async fn search(&self, query: &CompiledQuery) -> Result<SearchResult, EngineError>;

    /// Runs a compiled autocomplete request and returns the hit titles in rank order
    async fn suggest(&self, query: &CompiledQuery) -> Result<Vec<String>, EngineError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    hits: Hits<T>,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    total: Total,
    hits: Vec<Hit<T>>,
}

/// `hits.total` is an object on current engines and a bare count on old ones
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Count(u64),
}

impl Total {
    fn value(&self) -> u64 {
        match self {
            Self::Object { value } | Self::Count(value) => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(rename = "_source")]
    source: T,
}

#[derive(Debug, Deserialize)]
struct TitleSource {
    title: String,
}

/// Document mapping used when the index does not exist yet
fn index_mapping() -> serde_json::Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": { "type": "text", "analyzer": "standard" },
                "body": { "type": "text", "analyzer": "standard" },
                "url": { "type": "keyword" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" },
                "indexed_at": { "type": "date" }
            }
        }
    })
}

/// HTTP client for one engine index
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: Client,
    base_url: String,
    index: String,
    credentials: Option<(String, String)>,
}

impl EngineClient {
    /// Creates a client for the configured engine and index
    ///
    /// # Arguments
    ///
    /// * `config` - The search engine configuration
    ///
    /// # Returns
    ///
    /// * `Ok(EngineClient)` - Successfully built client
    /// * `Err(EngineError)` - Failed to build the HTTP client
    pub fn new(config: &SearchEngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            credentials,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    /// Returns the response if its status is 2xx, else a status error with the body
    async fn check_status(response: Response) -> Result<Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(EngineError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn post_search<T: DeserializeOwned>(
        &self,
        query: &CompiledQuery,
    ) -> Result<SearchResponse<T>, EngineError> {
        let url = format!("{}/_search", self.index_url());
        let response = self
            .authorize(self.client.post(&url))
            .json(query.body())
            .send()
            .await?;

        let text = Self::check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Creates the index with the article mapping unless it already exists
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The index was created
    /// * `Ok(false)` - The index already existed
    /// * `Err(EngineError)` - The engine could not be reached or refused the mapping
    pub async fn ensure_index(&self) -> Result<bool, EngineError> {
        let response = self
            .authorize(self.client.head(self.index_url()))
            .send()
            .await?;

        if response.status().as_u16() == 200 {
            tracing::info!("Search index '{}' already exists", self.index);
            return Ok(false);
        }

        let response = self
            .authorize(self.client.put(self.index_url()))
            .json(&index_mapping())
            .send()
            .await?;
        Self::check_status(response).await?;

        tracing::info!("Created search index '{}'", self.index);
        Ok(true)
    }

    /// Upserts `article` under its id, stamping `indexed_at`
    pub async fn index_article(&self, article: &Article) -> Result<(), EngineError> {
        let mut document = serde_json::to_value(article)?;
        document["indexed_at"] = json!(Utc::now().to_rfc3339());

        let url = format!("{}/_doc/{}", self.index_url(), article.id);
        let response = self
            .authorize(self.client.put(&url))
            .json(&document)
            .send()
            .await?;
        Self::check_status(response).await?;

        tracing::debug!("Indexed article {} ({})", article.id, article.title);
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for EngineClient {
    async fn search(&self, query: &CompiledQuery) -> Result<SearchResult, EngineError> {
        let response: SearchResponse<Article> = self.post_search(query).await?;

        Ok(SearchResult {
            total: response.hits.total.value(),
            articles: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
        })
    }

    async fn suggest(&self, query: &CompiledQuery) -> Result<Vec<String>, EngineError> {
        let response: SearchResponse<TitleSource> = self.post_search(query).await?;

        Ok(response
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.title)
            .collect())
    }
}

#[async_trait]
impl ArticleSink for EngineClient {
    fn name(&self) -> &str {
        "search engine"
    }

    async fn store(&self, article: &Article) -> Result<(), DocsearchError> {
        self.index_article(article).await?;
        Ok(())
    }
}
