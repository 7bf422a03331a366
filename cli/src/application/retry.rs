//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that must not be retried.
    Fatal { attempt: u32, error: E },
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
///
/// `op` receives the 1-based attempt number. `on_retry` is called with the
/// failed attempt number and its error only when another attempt follows;
/// the delay is slept after it and never after the last attempt.
///
/// # Errors
///
/// Returns [`RetryError::Fatal`] for the first non-retryable error and
/// [`RetryError::Exhausted`] carrying the last error otherwise.
pub async fn with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut on_retry: impl FnMut(u32, &E),
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => return Err(RetryError::Fatal { attempt, error }),
            Err(last) if attempt >= max => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last,
                });
            }
            Err(error) => {
                on_retry(attempt, &error);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
