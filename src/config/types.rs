use serde::Deserialize;

/// Main configuration structure for docsearch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub sitemap: Option<SitemapConfig>,
    #[serde(rename = "search-engine")]
    pub search_engine: SearchEngineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetch attempts in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Fixed delay before every fetch attempt (milliseconds)
    #[serde(rename = "courtesy-delay-ms", default = "default_courtesy_delay_ms")]
    pub courtesy_delay_ms: u64,

    /// Upper bound of the random jitter added to the courtesy delay (milliseconds)
    #[serde(rename = "max-jitter-ms", default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    /// Linear backoff unit between attempts of the same page (milliseconds)
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Number of retries after the first failed attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with page requests
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Sitemap-based target discovery
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapConfig {
    /// URL of the sitemap XML document
    pub url: String,

    /// Regex an article URL must match
    #[serde(rename = "article-pattern", default = "default_article_pattern")]
    pub article_pattern: String,

    /// Regexes that reject an otherwise matching URL
    #[serde(rename = "exclude-patterns", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// External search engine connection
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEngineConfig {
    /// Base URL of the engine (e.g., "http://localhost:9200")
    pub url: String,

    /// Index holding the article documents
    #[serde(default = "default_index")]
    pub index: String,

    /// Basic-auth user name
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

/// Search result cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime (seconds)
    #[serde(rename = "ttl-secs", default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Entry count above which a store sweeps expired entries
    #[serde(rename = "max-entries", default = "default_cache_max_entries")]
    pub max_entries: usize,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite article store, if crawled articles should be kept locally
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            courtesy_delay_ms: default_courtesy_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SitemapConfig {
    /// Sitemap at `url` with the default help-center article patterns
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            article_pattern: default_article_pattern(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

fn default_concurrency() -> u32 {
    15
}

fn default_courtesy_delay_ms() -> u64 {
    200
}

fn default_max_jitter_ms() -> u64 {
    300
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_article_pattern() -> String {
    r"/hc/en-us/articles/\d+-.+".to_string()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        r"/hc/en-us/articles/\d+$".to_string(),
        "/sections/".to_string(),
        "/categories/".to_string(),
        "/community/".to_string(),
    ]
}

fn default_index() -> String {
    "documentation-articles".to_string()
}

fn default_engine_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1000
}
