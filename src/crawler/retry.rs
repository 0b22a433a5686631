//! Retry policy for page fetches
//!
//! Every attempt is preceded by a courtesy delay with random jitter so the
//! crawl never hits the documentation server in bursts. After a failed
//! attempt `k - 1`, attempt `k` additionally waits `k × base_delay`
//! (linear backoff).

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::FailureKind;
use std::time::Duration;

/// Retry and pacing parameters shared by every target of a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first failed attempt
    pub max_retries: u32,

    /// Linear backoff unit
    pub base_delay: Duration,

    /// Fixed delay applied before every attempt
    pub courtesy_delay: Duration,

    /// Upper bound of the random jitter added to the courtesy delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            courtesy_delay: Duration::from_millis(200),
            max_jitter: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Builds the policy described by the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            courtesy_delay: Duration::from_millis(config.courtesy_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }

    /// A policy with no pacing at all, for tests and local mirrors
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            courtesy_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Starts tracking a fresh target
    pub fn begin(&self) -> RetryState {
        RetryState {
            attempt: 0,
            max_retries: self.max_retries,
            base_delay: self.base_delay,
        }
    }

    /// Delay to wait before backoff attempt `attempt` (0 for the first attempt)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Courtesy delay plus a fresh random jitter in `[0, max_jitter)`
    pub fn courtesy_delay(&self) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.courtesy_delay;
        }
        self.courtesy_delay + Duration::from_millis(rand::random_range(0..jitter_ms))
    }

    /// Total number of attempts a target may receive
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Per-target attempt counter, owned by exactly one worker
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryState {
    /// Zero-based number of the attempt about to run (or that just ran)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Number of attempts made once the current one has finished
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    /// Whether a failure of `kind` on the current attempt may be retried
    pub fn should_retry(&self, kind: FailureKind) -> bool {
        kind.is_retryable() && self.attempt < self.max_retries
    }

    /// Moves to the next attempt and returns the backoff to wait before it
    pub fn advance(&mut self) -> Duration {
        self.attempt += 1;
        self.base_delay.saturating_mul(self.attempt)
    }
}
