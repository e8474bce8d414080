//! # Retry Engine
//!
//! Exponential backoff for ledger calls that may hit transient contention.
//! Only failures whose code is on the retryable allow-list are retried.
//!
//! ```text
//! attempt 0 ──fail──▶ sleep(base) ──▶ attempt 1 ──fail──▶ sleep(2·base) ──▶ ...
//! ```

use std::future::Future;
use std::time::Duration;

use chainbrawler_shared::UNKNOWN_ERROR_CODE;

use crate::classifier::ErrorClassifier;
use crate::error::{ClassifiedError, ErrorCategory, LedgerError};

/// How many times to try and how long to wait in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles after every failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait after the failed attempt `attempt_index` (0-based):
    /// `base_delay × 2^attempt_index`, saturating.
    #[must_use]
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable code, or
/// runs out of attempts.
///
/// Every failure is classified (and published) through `classifier`; the
/// last classified error is returned.
///
/// # Errors
///
/// The classified error of the final failed attempt, or a synthesized
/// "Max retries exceeded" error when no attempt was made at all.
pub async fn retry<T, F, Fut>(
    classifier: &ErrorClassifier,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut last_error: Option<ClassifiedError> = None;

    for attempt in 0..policy.max_attempts {
        let failure = match operation().await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        let classified = classifier.classify(failure, &[("attempt", (attempt + 1).to_string())]);
        if !classified.retryable || attempt + 1 >= policy.max_attempts {
            return Err(classified);
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            code = classified.code,
            attempt = attempt + 1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Retryable ledger failure, backing off"
        );
        last_error = Some(classified);
        tokio::time::sleep(delay).await;
    }

    Err(last_error.unwrap_or_else(max_retries_exceeded))
}

fn max_retries_exceeded() -> ClassifiedError {
    ClassifiedError {
        category: ErrorCategory::Unknown,
        code: UNKNOWN_ERROR_CODE,
        message: "Max retries exceeded".to_string(),
        retryable: false,
        context: std::collections::BTreeMap::new(),
        cause: None,
    }
}
