//! Redelivery with exponential backoff
//!
//! The reconciler itself never retries. This is the redelivery half of the
//! at-least-once contract: a failed event is handed back to the reconciler
//! after a backoff, which is safe because every reconciliation step is
//! idempotent on replay.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How often and how patiently a failed event is redelivered
#[derive(Debug, Clone)]
pub struct RedeliveryPolicy {
    /// Redeliveries after the first attempt
    pub max_redeliveries: u32,

    /// Delay before the first redelivery
    pub initial_backoff: Duration,

    /// Upper bound on any single delay
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            max_redeliveries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RedeliveryPolicy {
    /// Deliver exactly once; failures go straight back to the caller
    pub fn none() -> Self {
        Self {
            max_redeliveries: 0,
            ..Default::default()
        }
    }

    /// Short delays, for tests and interactive runs
    pub fn quick() -> Self {
        Self {
            max_redeliveries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }

    /// Delay before redelivery number `attempt` (zero-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()))
    }
}

/// Retry classification for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient; redelivering the same event may succeed
    Retry,
    /// Permanent; the event must be fixed at the source
    NoRetry,
}

/// Errors that know whether redelivery can help
pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Run `operation` until it succeeds, fails permanently, or the policy is exhausted
///
/// Returns the result together with the number of attempts made.
pub async fn redeliver<F, Fut, T, E>(
    policy: &RedeliveryPolicy,
    label: &str,
    mut operation: F,
) -> (Result<T, E>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return (Ok(value), attempt + 1),
            Err(e) => e,
        };

        if err.retry_decision() == RetryDecision::NoRetry {
            debug!(event = label, attempt, "Not redelivering after permanent error: {}", err);
            return (Err(err), attempt + 1);
        }

        if attempt >= policy.max_redeliveries {
            warn!(
                event = label,
                attempts = attempt + 1,
                "Giving up after {} attempts: {}",
                attempt + 1,
                err
            );
            return (Err(err), attempt + 1);
        }

        let backoff = policy.backoff_duration(attempt);
        warn!(
            event = label,
            attempt = attempt + 1,
            backoff_ms = backoff.as_millis() as u64,
            "Redelivering after error: {}",
            err
        );
        sleep(backoff).await;
        attempt += 1;
    }
}
