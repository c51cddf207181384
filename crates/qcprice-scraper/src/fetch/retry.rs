//! Fixed-delay retry for browser navigation.
//!
//! Transient render failures (navigation errors, timeouts, a crashed browser)
//! are retried after a constant pause. Anything else is surfaced on the first
//! attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// The last error seen once retries stop, with the number of attempts made.
#[derive(Debug)]
pub(crate) struct RetryExhausted {
    pub(crate) attempts: u32,
    pub(crate) last: ScraperError,
}

/// Returns `true` if `err` is a transient render failure worth another attempt.
///
/// [`ScraperError::Browser`] and [`ScraperError::Timeout`] are retriable
/// because the renderer drops a poisoned session before returning them, so
/// the next attempt relaunches.
fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::Navigation { .. }
            | ScraperError::Timeout { .. }
            | ScraperError::Browser { .. }
            | ScraperError::Http(_)
    )
}

/// Executes `operation` up to `max_attempts` times in total, sleeping `delay`
/// between attempts. `max_attempts` of zero is treated as one.
///
/// Non-retriable errors stop immediately.
pub(crate) async fn retry_with_fixed_delay<T, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut operation: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "render attempt failed, retrying"
                );
            }
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
