//! Exponential backoff for transient HTTP failures

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

const INITIAL_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 400;

/// Helper function to determine if an error is transient (retryable)
pub fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.status().is_some_and(|s| s.is_server_error())
}

/// Backoff before retry number `attempt` (zero based): 100ms, 200ms, 400ms
pub fn backoff_for(attempt: u32) -> Duration {
    let backoff_ms = INITIAL_BACKOFF_MS.saturating_mul(2_u64.saturating_pow(attempt));
    Duration::from_millis(backoff_ms.min(MAX_BACKOFF_MS))
}

/// Execute a request with exponential backoff retry logic
///
/// Transport errors that look transient and 5xx responses are retried up to
/// `max_retries` times. The last response or error is returned unchanged.
pub async fn execute_with_retry<F, Fut>(
    max_retries: u32,
    mut request_fn: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;

    loop {
        match request_fn().await {
            Ok(response) if response.status().is_server_error() && attempt < max_retries => {
                let backoff = backoff_for(attempt);
                warn!(
                    "Server error {} on attempt {}/{}, retrying after {}ms",
                    response.status(),
                    attempt + 1,
                    max_retries,
                    backoff.as_millis()
                );
                sleep(backoff).await;
                attempt += 1;
            }
            Ok(response) => return Ok(response),
            Err(err) => {
                if is_transient_error(&err) && attempt < max_retries {
                    let backoff = backoff_for(attempt);
                    warn!(
                        "Transient error on attempt {}/{}, retrying after {}ms: {}",
                        attempt + 1,
                        max_retries,
                        backoff.as_millis(),
                        err
                    );
                    sleep(backoff).await;
                    attempt += 1;
                } else {
                    if attempt >= max_retries {
                        debug!("Max retries ({}) exceeded for request", max_retries);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_for(0), Duration::from_millis(100));
        assert_eq!(backoff_for(1), Duration::from_millis(200));
        assert_eq!(backoff_for(2), Duration::from_millis(400));
        assert_eq!(backoff_for(7), Duration::from_millis(400));
    }
}
