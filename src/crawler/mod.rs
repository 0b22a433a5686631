//! Crawler module for documentation article fetching
//!
//! This module contains the core crawling logic, including:
//! - Retry policy with courtesy delay and linear backoff
//! - Single-attempt fetch workers with content validation
//! - Candidate extraction from help-center pages
//! - Sitemap target discovery
//! - Bounded-concurrency crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod retry;
mod targets;

pub use coordinator::{crawl, crawl_with_cancel, Coordinator, CrawlStream, CrawlTarget, FetchOutcome};
pub use extractor::{clean_html, Extractor, HtmlExtractor, PageCandidates};
pub use fetcher::{
    build_article, build_http_client, parse_target, FailureKind, FetchFailure, HttpFetcher,
    PageFetcher,
};
pub use retry::{RetryPolicy, RetryState};
pub use targets::{discover_targets, fetch_sitemap_urls, filter_article_urls, parse_sitemap};

use crate::output::CrawlReport;
use crate::storage::ArticleSink;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl and hands every article to the sinks
///
/// This is the main entry point for a crawl run. It will:
/// 1. Start the coordinator over `targets`
/// 2. Pass each fetched article to every sink as it arrives
/// 3. Record successes, failures and sink errors in a report
///
/// Sink errors are logged and counted; they never stop the crawl.
///
/// # Arguments
///
/// * `coordinator` - The configured crawl coordinator
/// * `targets` - URLs to crawl
/// * `sinks` - Destinations for fetched articles
/// * `cancel` - Stop signal; outcomes already in flight are still recorded
///
/// # Returns
///
/// The crawl report
pub async fn run_crawl(
    coordinator: &Coordinator,
    targets: Vec<CrawlTarget>,
    sinks: &[Box<dyn ArticleSink>],
    cancel: CancellationToken,
) -> CrawlReport {
    let mut report = CrawlReport::new(targets.len());
    let mut stream = coordinator.crawl_with_cancel(targets, cancel);

    while let Some(outcome) = stream.next().await {
        if let FetchOutcome::Success { article, .. } = &outcome {
            tracing::info!("Fetched: {}", article.title);

            for sink in sinks {
                if let Err(e) = sink.store(article).await {
                    tracing::warn!("{} failed to store {}: {}", sink.name(), article.title, e);
                    report.record_sink_error();
                }
            }
        }

        report.record(&outcome);
    }

    report.finish();
    report
}
