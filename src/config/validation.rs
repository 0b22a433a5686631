use crate::config::types::{CacheConfig, Config, CrawlerConfig, SearchEngineConfig, SitemapConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    if let Some(sitemap) = &config.sitemap {
        validate_sitemap_config(sitemap)?;
    }
    validate_search_engine_config(&config.search_engine)?;
    validate_cache_config(&config.cache)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates sitemap configuration
fn validate_sitemap_config(config: &SitemapConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.url, "sitemap url")?;

    Regex::new(&config.article_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!(
            "article_pattern '{}': {}",
            config.article_pattern, e
        ))
    })?;

    for pattern in &config.exclude_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("exclude pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

/// Validates search engine configuration
fn validate_search_engine_config(config: &SearchEngineConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.url, "search engine url")?;

    if config.index.is_empty() {
        return Err(ConfigError::Validation("index cannot be empty".to_string()));
    }

    // Index names are lowercase and must not contain path separators
    if config.index != config.index.to_lowercase()
        || config
            .index
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | ','))
    {
        return Err(ConfigError::Validation(format!(
            "index '{}' must be lowercase without special characters",
            config.index
        )));
    }

    if config.username.is_some() != config.password.is_some() {
        return Err(ConfigError::Validation(
            "username and password must be set together".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.ttl_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "ttl_secs must be >= 1, got {}",
            config.ttl_secs
        )));
    }

    if config.max_entries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_entries must be >= 1, got {}",
            config.max_entries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.database_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "database_path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates that `value` is an absolute HTTP(S) URL
fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}
