//! Crawl coordinator - bounded fan-out of fetch workers
//!
//! The coordinator takes a list of crawl targets and:
//! - Admits at most `concurrency` workers at a time through a semaphore
//! - Runs each target's attempts strictly in sequence under the retry policy
//! - Streams every terminal outcome back as soon as it is known
//! - Stops admitting new attempts once the stop signal fires
//!
//! One target's failure never touches another target; partial failure is
//! reported as data, not raised as an error.

use crate::article::Article;
use crate::config::CrawlerConfig;
use crate::crawler::extractor::HtmlExtractor;
use crate::crawler::fetcher::{
    build_http_client, parse_target, FailureKind, FetchFailure, HttpFetcher, PageFetcher,
};
use crate::crawler::retry::RetryPolicy;
use crate::DocsearchError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An opaque identifier (URL) to fetch
pub type CrawlTarget = String;

/// Terminal result for one crawl target
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The target produced a validated article
    Success {
        target: CrawlTarget,
        article: Article,
        attempts: u32,
    },

    /// The target failed on its last permitted attempt
    Failure {
        target: CrawlTarget,
        kind: FailureKind,
        attempts: u32,
        error: String,
    },
}

impl FetchOutcome {
    fn failure(target: CrawlTarget, failure: FetchFailure, attempts: u32) -> Self {
        Self::Failure {
            target,
            kind: failure.kind,
            attempts,
            error: failure.message,
        }
    }

    /// The target this outcome belongs to
    pub fn target(&self) -> &str {
        match self {
            Self::Success { target, .. } | Self::Failure { target, .. } => target,
        }
    }

    /// Number of attempts made for the target
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Lazy, finite sequence of crawl outcomes
///
/// Outcomes arrive in completion order. [`CrawlStream::next`] returns `None`
/// once every admitted worker has finished. Dropping the stream stops the
/// crawl from admitting further attempts.
pub struct CrawlStream {
    receiver: mpsc::Receiver<FetchOutcome>,
    stop: CancellationToken,
    driver: JoinHandle<()>,
}

impl CrawlStream {
    /// Waits for the next outcome; `None` marks the end of the crawl
    pub async fn next(&mut self) -> Option<FetchOutcome> {
        self.receiver.recv().await
    }

    /// Stops admitting new attempts; attempts in flight run to completion
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Whether [`CrawlStream::stop`] (or the parent token) has fired
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Drains the stream into a vector
    pub async fn collect(mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}

impl Drop for CrawlStream {
    fn drop(&mut self) {
        self.stop.cancel();
        if self.driver.is_finished() {
            return;
        }
        tracing::debug!("Crawl stream dropped before completion, stopping admission");
    }
}

/// Crawls `targets` with at most `concurrency` attempts in flight
///
/// Must be called from within a Tokio runtime.
pub fn crawl(
    fetcher: Arc<dyn PageFetcher>,
    targets: Vec<CrawlTarget>,
    concurrency: usize,
    policy: RetryPolicy,
) -> CrawlStream {
    crawl_with_cancel(fetcher, targets, concurrency, policy, CancellationToken::new())
}

/// Like [`crawl`], stopping when `cancel` fires
pub fn crawl_with_cancel(
    fetcher: Arc<dyn PageFetcher>,
    targets: Vec<CrawlTarget>,
    concurrency: usize,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> CrawlStream {
    let concurrency = concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let stop = cancel.child_token();
    let capacity = concurrency.saturating_mul(2).min(Semaphore::MAX_PERMITS);
    let (sender, receiver) = mpsc::channel(capacity);

    tracing::info!(
        "Crawling {} targets with concurrency {} (max {} attempts each)",
        targets.len(),
        concurrency,
        policy.max_attempts()
    );

    let driver = tokio::spawn(admit_workers(
        fetcher,
        targets,
        Arc::new(Semaphore::new(concurrency)),
        Arc::new(policy),
        stop.clone(),
        sender,
    ));

    CrawlStream {
        receiver,
        stop,
        driver,
    }
}

/// Spawns one worker per target, each only after it holds a permit
///
/// The driver's sender is dropped when this returns; the channel closes once
/// the last worker drops its clone.
async fn admit_workers(
    fetcher: Arc<dyn PageFetcher>,
    targets: Vec<CrawlTarget>,
    semaphore: Arc<Semaphore>,
    policy: Arc<RetryPolicy>,
    stop: CancellationToken,
    sender: mpsc::Sender<FetchOutcome>,
) {
    let total = targets.len();

    for (admitted, target) in targets.into_iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            tracing::info!(
                "Crawl stopped after admitting {} of {} targets",
                admitted,
                total
            );
            break;
        };

        let fetcher = fetcher.clone();
        let policy = policy.clone();
        let stop = stop.clone();
        let sender = sender.clone();

        tokio::spawn(async move {
            let _permit = permit;
            if let Some(outcome) = process_target(fetcher.as_ref(), target, &policy, &stop).await {
                // A closed channel means the caller stopped listening
                let _ = sender.send(outcome).await;
            }
        });
    }
}

/// Runs a single target's attempts under the retry policy
///
/// Returns `None` only when the stop signal fired before the first attempt.
async fn process_target(
    fetcher: &dyn PageFetcher,
    target: CrawlTarget,
    policy: &RetryPolicy,
    stop: &CancellationToken,
) -> Option<FetchOutcome> {
    let url = match parse_target(&target) {
        Ok(url) => url,
        Err(failure) => {
            tracing::warn!("Skipping {}: {}", target, failure);
            return Some(FetchOutcome::failure(target, failure, 1));
        }
    };

    let mut state = policy.begin();
    let mut backoff = Duration::ZERO;
    let mut last_failure: Option<FetchFailure> = None;

    loop {
        let delay = backoff + policy.courtesy_delay();
        let stopped = tokio::select! {
            biased;
            _ = stop.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        };
        if stopped {
            tracing::debug!("Stop requested before attempt {} of {}", state.attempt(), target);
            return last_failure.map(|failure| FetchOutcome::failure(target, failure, state.attempt()));
        }

        tracing::trace!("Fetching {} (attempt {})", target, state.attempt());

        match fetcher.fetch(&url).await {
            Ok(article) => {
                tracing::debug!("Fetched {} after {} attempt(s)", target, state.attempts_made());
                return Some(FetchOutcome::Success {
                    target,
                    article,
                    attempts: state.attempts_made(),
                });
            }
            Err(failure) => {
                if !state.should_retry(failure.kind) {
                    tracing::warn!(
                        "Giving up on {} after {} attempt(s): {}",
                        target,
                        state.attempts_made(),
                        failure
                    );
                    let attempts = state.attempts_made();
                    return Some(FetchOutcome::failure(target, failure, attempts));
                }

                backoff = state.advance();
                tracing::debug!(
                    "Retrying {} (attempt {}/{}) after {}",
                    target,
                    state.attempt(),
                    policy.max_retries,
                    failure
                );
                last_failure = Some(failure);
            }
        }
    }
}

/// Crawl entry point configured from [`CrawlerConfig`]
pub struct Coordinator {
    fetcher: Arc<dyn PageFetcher>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP with the help-center extractor
    pub fn new(config: &CrawlerConfig) -> Result<Self, DocsearchError> {
        let client = build_http_client(config)?;
        let fetcher = HttpFetcher::new(client, Arc::new(HtmlExtractor::new()));

        Ok(Self {
            fetcher: Arc::new(fetcher),
            policy: RetryPolicy::from_config(config),
            concurrency: config.concurrency as usize,
        })
    }

    /// Creates a coordinator around any fetch worker
    pub fn with_fetcher(
        fetcher: Arc<dyn PageFetcher>,
        policy: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            policy,
            concurrency,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Starts crawling `targets`
    pub fn crawl(&self, targets: Vec<CrawlTarget>) -> CrawlStream {
        self.crawl_with_cancel(targets, CancellationToken::new())
    }

    /// Starts crawling `targets`, stopping when `cancel` fires
    pub fn crawl_with_cancel(
        &self,
        targets: Vec<CrawlTarget>,
        cancel: CancellationToken,
    ) -> CrawlStream {
        crawl_with_cancel(
            self.fetcher.clone(),
            targets,
            self.concurrency,
            self.policy.clone(),
            cancel,
        )
    }
}
