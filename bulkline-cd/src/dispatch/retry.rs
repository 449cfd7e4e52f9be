//! Bounded retry combinator
//!
//! Wraps the whole per-contact attempt protocol as one retryable unit,
//! replacing scattered nested error handling with a single place that
//! owns the attempt budget and inter-attempt pause.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Terminal failure after the attempt budget is spent (or a
/// non-retryable error short-circuits it)
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub error: E,
    /// Attempts actually consumed, including the failing one
    pub attempts: u32,
}

/// Run `op` up to `max_attempts` times with a fixed pause between
/// attempts. `retryable` decides whether a given error is worth another
/// attempt; a non-retryable error ends the loop immediately.
///
/// Returns the success value together with the number of attempts used.
pub async fn bounded<T, E, F, Fut, R>(
    max_attempts: u32,
    pause: Duration,
    mut op: F,
    retryable: R,
) -> Result<(T, u32), RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(error) => {
                if !retryable(&error) || attempt >= max_attempts {
                    return Err(RetryExhausted { error, attempts: attempt });
                }
                debug!("Attempt {}/{} failed: {}", attempt, max_attempts, error);
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
        }
    }
}
