//! Crawl target discovery from a sitemap
//!
//! A sitemap lists every page of the help center; only real article pages
//! (matching the article pattern and none of the exclude patterns) become
//! crawl targets.

use crate::config::SitemapConfig;
use crate::crawler::coordinator::CrawlTarget;
use crate::DocsearchError;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;

fn loc_regex() -> &'static Regex {
    static LOC: OnceLock<Regex> = OnceLock::new();
    LOC.get_or_init(|| Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").expect("static regex"))
}

/// Fetches a sitemap and returns every `<loc>` value in document order
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The sitemap URL
///
/// # Returns
///
/// * `Ok(Vec<String>)` - All listed URLs
/// * `Err(DocsearchError)` - Transport failure, non-200 status, or a document
///   that is not a sitemap
pub async fn fetch_sitemap_urls(client: &Client, url: &str) -> Result<Vec<String>, DocsearchError> {
    tracing::info!("Fetching sitemap {}", url);

    let response = client.get(url).send().await.map_err(|e| DocsearchError::Sitemap {
        url: url.to_string(),
        message: format!("request failed: {}", e),
    })?;

    let status = response.status();
    if status.as_u16() != 200 {
        return Err(DocsearchError::Sitemap {
            url: url.to_string(),
            message: format!("returned HTTP {}", status.as_u16()),
        });
    }

    let content = response.text().await?;
    let urls = parse_sitemap(&content).ok_or_else(|| DocsearchError::Sitemap {
        url: url.to_string(),
        message: "response is not an XML urlset".to_string(),
    })?;

    tracing::debug!("Sitemap {} lists {} URLs", url, urls.len());
    Ok(urls)
}

/// Extracts `<loc>` values from a sitemap document
///
/// Returns `None` when the document has no `<urlset>` root (an HTML error
/// page served with status 200, for example).
pub fn parse_sitemap(content: &str) -> Option<Vec<String>> {
    if !content.contains("<urlset") {
        return None;
    }

    Some(
        loc_regex()
            .captures_iter(content)
            .map(|caps| unescape_xml(&caps[1]))
            .filter(|loc| !loc.is_empty())
            .collect(),
    )
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Keeps the URLs that are article pages according to `config`
///
/// # Arguments
///
/// * `urls` - Candidate URLs from the sitemap
/// * `config` - Sitemap configuration holding the article and exclude patterns
///
/// # Returns
///
/// * `Ok(Vec<CrawlTarget>)` - Matching URLs in their original order
/// * `Err(regex::Error)` - A pattern failed to compile
pub fn filter_article_urls(
    urls: Vec<String>,
    config: &SitemapConfig,
) -> Result<Vec<CrawlTarget>, regex::Error> {
    let article = Regex::new(&config.article_pattern)?;
    let excludes = config
        .exclude_patterns
        .iter()
        .map(|pattern| Regex::new(pattern))
        .collect::<Result<Vec<_>, _>>()?;

    let total = urls.len();
    let filtered: Vec<CrawlTarget> = urls
        .into_iter()
        .filter(|url| article.is_match(url))
        .filter(|url| !excludes.iter().any(|exclude| exclude.is_match(url)))
        .collect();

    tracing::info!("{} of {} sitemap URLs are article pages", filtered.len(), total);
    Ok(filtered)
}

/// Fetches the sitemap named by `config` and returns the article targets
pub async fn discover_targets(
    client: &Client,
    config: &SitemapConfig,
) -> Result<Vec<CrawlTarget>, DocsearchError> {
    let urls = fetch_sitemap_urls(client, &config.url).await?;
    Ok(filter_article_urls(urls, config)?)
}
