//! Retry with exponential backoff for the storefront fetch.
//!
//! Only transient conditions are retried: 429, 5xx and network failures.
//! Everything else is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Returns `true` if `err` is worth another attempt after a delay.
///
/// Retriable:
/// - [`ScraperError::RateLimited`]: HTTP 429
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status
/// - [`ScraperError::Http`]: connection reset, timeout and the like
///
/// A 404, a 4xx, a catalog rejection or a bad URL will not change on retry.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Runs `operation`, retrying transient failures up to `max_retries` more
/// times.
///
/// The wait before retry `n` (counting from zero) is
/// `backoff_base_secs * 2^n` seconds. With `max_retries = 3` the operation
/// runs at most 4 times. The last error is returned when retries run out.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
