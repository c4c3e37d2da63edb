//! Retry policy for ordinary (non-polling) requests.

use log::{debug, warn};
use std::time::Duration;

use crate::error::{RenamedError, Result};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// How many times, and how far apart, a request is re-sent after a
/// transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Only transport failures are worth repeating; anything the service
/// answered (4xx or 5xx), and anything we failed to decode, is final.
/// A request that could not even be built (bad URL) fails the same way
/// every time.
pub fn is_retryable(error: &RenamedError) -> bool {
    match error {
        RenamedError::Network(e) => !e.is_builder(),
        _ => false,
    }
}

/// Executes an async operation, re-running it on transport failures until
/// the policy's attempt budget is spent.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempt >= attempts {
                    debug!(
                        "{}: giving up after {} attempts: {}",
                        operation_name, attempts, e
                    );
                    return Err(e);
                }

                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    attempt,
                    attempts,
                    e,
                    policy.delay.as_millis()
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::from_millis(1),
        }
    }

    /// A real transport error: nothing listens on port 1.
    async fn connection_refused() -> RenamedError {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        RenamedError::Network(err)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(policy.attempts(), DEFAULT_MAX_RETRIES + 1);
        assert_eq!(policy.delay, Duration::from_millis(RETRY_DELAY_MS));
    }

    #[tokio::test]
    async fn test_is_retryable() {
        assert!(is_retryable(&connection_refused().await));
        assert!(!is_retryable(&RenamedError::Validation {
            message: "bad".to_string()
        }));
        assert!(!is_retryable(&RenamedError::Server {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            message: "boom".to_string()
        }));
        assert!(!is_retryable(&RenamedError::malformed("garbage")));
    }

    #[tokio::test]
    async fn test_builder_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<()> = with_retry(fast_policy(3), "test", || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let err = reqwest::Client::new()
                    .get("not a url/user")
                    .send()
                    .await
                    .unwrap_err();
                Err(RenamedError::Network(err))
            }
        })
        .await;

        assert!(matches!(result, Err(RenamedError::Network(ref e)) if e.is_builder()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_success() {
        let result = with_retry(fast_policy(2), "test", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_retry_immediate_failure_on_client_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<()> = with_retry(fast_policy(5), "test", || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RenamedError::Authentication {
                    message: "Invalid API key".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(RenamedError::Authentication { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_retries_on_network_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result = with_retry(fast_policy(2), "test", || {
            let calls = Arc::clone(&calls_clone);
            async move {
                let current = calls.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    Err(connection_refused().await)
                } else {
                    Ok("success after retries")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success after retries");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<()> = with_retry(fast_policy(3), "test", || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(connection_refused().await)
            }
        })
        .await;

        assert!(matches!(result, Err(RenamedError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_with_retry_zero_retries_is_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<()> = with_retry(fast_policy(0), "test", || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(connection_refused().await)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
