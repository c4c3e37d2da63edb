//! Maps non-2xx responses onto [`RenamedError`] variants.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::RenamedError;

/// Builds the typed error for a response with a non-success `status`.
///
/// The mapping is by status code only. The body supplies the message and,
/// for 429, the retry-after hint; when it is not JSON the message falls back
/// to the status line.
///
/// The body looks like `{"error": "...", "retryAfter": 60}`. Each field is
/// read on its own, so an off-type field does not hide the others.
pub fn classify_response(status: StatusCode, body: &str) -> RenamedError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = parsed
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status_line(status));

    match status {
        StatusCode::BAD_REQUEST => RenamedError::Validation { message },
        StatusCode::UNAUTHORIZED => RenamedError::Authentication { message },
        StatusCode::PAYMENT_REQUIRED => RenamedError::InsufficientCredits { message },
        StatusCode::NOT_FOUND => RenamedError::NotFound { message },
        StatusCode::TOO_MANY_REQUESTS => RenamedError::RateLimit {
            message,
            retry_after: parsed
                .get("retryAfter")
                .and_then(Value::as_f64)
                .map(truncate_seconds),
        },
        s if s.is_server_error() => RenamedError::Server { status: s, message },
        s => RenamedError::RequestFailed { status: s, message },
    }
}

/// Wraps a failure where no response was received.
pub fn classify_transport(error: reqwest::Error) -> RenamedError {
    RenamedError::Network(error)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn truncate_seconds(seconds: f64) -> u64 {
    // Negative values saturate to zero.
    seconds.trunc() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn classify(code: u16, body: &str) -> RenamedError {
        classify_response(StatusCode::from_u16(code).unwrap(), body)
    }

    #[test]
    fn test_classify_exact_kinds() {
        let body = r#"{"error": "nope"}"#;
        assert_eq!(classify(400, body).kind(), ErrorKind::Validation);
        assert_eq!(classify(401, body).kind(), ErrorKind::Authentication);
        assert_eq!(classify(402, body).kind(), ErrorKind::InsufficientCredits);
        assert_eq!(classify(404, body).kind(), ErrorKind::NotFound);
        assert_eq!(classify(429, body).kind(), ErrorKind::RateLimit);
        assert_eq!(classify(500, body).kind(), ErrorKind::Server);
        assert_eq!(classify(503, body).kind(), ErrorKind::Server);
    }

    #[test]
    fn test_classify_other_status_is_request_failed() {
        let err = classify(409, r#"{"error": "Conflict on job"}"#);
        match err {
            RenamedError::RequestFailed { status, message } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(message, "Conflict on job");
            }
            other => panic!("Expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_keeps_service_message() {
        match classify(401, r#"{"error": "Invalid API key"}"#) {
            RenamedError::Authentication { message } => assert_eq!(message, "Invalid API key"),
            other => panic!("Expected Authentication, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_rate_limit_retry_after() {
        match classify(429, r#"{"error": "Rate limit exceeded", "retryAfter": 60}"#) {
            RenamedError::RateLimit {
                message,
                retry_after,
            } => {
                assert_eq!(message, "Rate limit exceeded");
                assert_eq!(retry_after, Some(60));
            }
            other => panic!("Expected RateLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_rate_limit_fractional_retry_after_truncates() {
        match classify(429, r#"{"error": "slow", "retryAfter": 12.9}"#) {
            RenamedError::RateLimit { retry_after, .. } => assert_eq!(retry_after, Some(12)),
            other => panic!("Expected RateLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_rate_limit_without_hint() {
        match classify(429, r#"{"error": "slow"}"#) {
            RenamedError::RateLimit { retry_after, .. } => assert_eq!(retry_after, None),
            other => panic!("Expected RateLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_off_type_retry_after_keeps_message() {
        match classify(429, r#"{"error": "slow", "retryAfter": "60"}"#) {
            RenamedError::RateLimit {
                message,
                retry_after,
            } => {
                assert_eq!(message, "slow");
                assert_eq!(retry_after, None);
            }
            other => panic!("Expected RateLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_off_type_error_falls_back_to_status_line() {
        match classify(400, r#"{"error": {"code": 7}}"#) {
            RenamedError::Validation { message } => assert_eq!(message, "HTTP 400 Bad Request"),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_non_json_body_falls_back_to_status_line() {
        match classify(502, "<html>Bad Gateway</html>") {
            RenamedError::Server { status, message } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "HTTP 502 Bad Gateway");
            }
            other => panic!("Expected Server, got {:?}", other),
        }

        // Classification still follows the status code.
        assert_eq!(classify(402, "").kind(), ErrorKind::InsufficientCredits);
    }

    #[test]
    fn test_classify_json_without_error_field() {
        match classify(404, r#"{"detail": "gone"}"#) {
            RenamedError::NotFound { message } => assert_eq!(message, "HTTP 404 Not Found"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
