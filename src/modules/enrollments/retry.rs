//! Resubmission of whole enrollment transactions after a retryable conflict.
//!
//! The service never retries on its own; callers that want to resubmit after
//! a deadlock or lock timeout wrap the call in [`retry_on_conflict`].

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::EnrollmentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`, doubling from `base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
pub async fn retry_on_conflict<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, EnrollmentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EnrollmentError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(attempt, ?delay, error = %err, "Retrying enrollment transaction");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}
