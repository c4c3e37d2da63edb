//! HTTP plumbing: authenticated requests, error classification and retry.

mod classify;
mod client;
mod retry;

pub use classify::{classify_response, classify_transport};
pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpClient, RequestBody, Upload};
pub use retry::{DEFAULT_MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy, is_retryable, with_retry};
