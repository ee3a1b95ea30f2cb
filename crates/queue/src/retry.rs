//! Webhook retry policy and dead letter handling.

#![allow(missing_docs)]

use std::time::Duration;

use crate::jobs::WebhookDeliveryJob;

/// Maximum number of delivery attempts per job.
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff table in seconds. `BACKOFF_SECS[n]` is waited before attempt
/// `n + 2`.
pub const BACKOFF_SECS: [u64; 3] = [60, 300, 900];

/// Retry policy with an explicit backoff table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delays before the second, third, ... attempt.
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: BACKOFF_SECS.iter().copied().map(Duration::from_secs).collect(),
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Enqueue `job` to run after `delay`.
    Retry {
        job: WebhookDeliveryJob,
        delay: Duration,
    },
    /// No attempts left.
    Exhausted,
}

impl RetryPolicy {
    /// Delay to wait before running attempt number `attempt` (1-based).
    ///
    /// `None` for the first attempt and for attempts past the ceiling. A
    /// table shorter than the ceiling repeats its last entry.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 || attempt > self.max_attempts {
            return None;
        }
        let index = usize::try_from(attempt - 2).unwrap_or(usize::MAX);
        self.backoff
            .get(index)
            .or_else(|| self.backoff.last())
            .copied()
    }

    /// Decide what follows a failed run of `job`.
    #[must_use]
    pub fn after_failure(&self, job: &WebhookDeliveryJob) -> RetryDecision {
        let next = job.next_attempt();
        match self.delay_before(next.attempt) {
            Some(delay) => RetryDecision::Retry { job: next, delay },
            None => RetryDecision::Exhausted,
        }
    }
}

/// Dead letter entry for jobs that exhausted their attempts.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry<T> {
    /// The failed job.
    pub job: T,
    /// Number of attempts made.
    pub attempts: u32,
    /// Last error message.
    pub last_error: String,
    /// Timestamp of last failure.
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

impl<T> DeadLetterEntry<T> {
    /// Create a new dead letter entry.
    pub fn new(job: T, attempts: u32, error: String) -> Self {
        Self {
            job,
            attempts,
            last_error: error,
            failed_at: chrono::Utc::now(),
        }
    }
}
