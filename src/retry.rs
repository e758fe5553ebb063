//! Exponential backoff with jitter for idempotent remote reads.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::RecoveryConfig;

/// Delay before retry `attempt` (1-based) in milliseconds.
///
/// Doubles from `base_retry_delay_ms`, capped at `max_retry_delay_ms`, plus
/// up to 10% random jitter so concurrent callers do not retry in lockstep.
pub fn calculate_retry_delay(attempt: u32, recovery: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    let jitter_range = delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    delay + jitter
}

/// Run `operation` until it succeeds, `is_retryable` rejects the error, or
/// `max_retries` retries have been spent.
pub async fn with_retry<T, E, F, Fut>(
    label: &str,
    recovery: &RecoveryConfig,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < recovery.max_retries && is_retryable(&e) => {
                attempt += 1;
                let delay = calculate_retry_delay(attempt, recovery);
                tracing::warn!(
                    operation = label,
                    attempt,
                    delay_ms = delay,
                    error = %e,
                    "Remote call failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
