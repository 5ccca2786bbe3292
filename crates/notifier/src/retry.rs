//! Bounded exponential-backoff retry for delivery attempts.
//!
//! Between attempt *i* (0-indexed) and attempt *i + 1* the caller sleeps
//! `2^i` seconds: 1s, 2s, 4s, ... No sleep follows the final failure.
//!
//! The policy is attempt-count-bounded, not deadline-bounded, and it does not
//! inspect the error: a permanent routing error burns its attempts exactly
//! like a transient SMTP failure. Callers that need a wall-clock bound or
//! cancellation race the returned future against their shutdown signal.

use std::future::Future;
use std::time::Duration;

/// Invoke `attempt` up to `max_attempts` times, sleeping `2^i` seconds after
/// failed attempt `i` when more attempts remain.
///
/// Returns `Ok(())` on the first success, the last observed error once the
/// attempts are exhausted, and `Ok(())` without calling `attempt` when
/// `max_attempts` is zero.
pub async fn with_retry<F, Fut, E>(mut attempt: F, max_attempts: u32) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut last_error = None;

    for i in 0..max_attempts {
        match attempt().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_error = Some(e);
                if i + 1 < max_attempts {
                    tokio::time::sleep(backoff(i)).await;
                }
            }
        }
    }

    match last_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Backoff after failed attempt `i`: `2^i` seconds.
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(62))
}
