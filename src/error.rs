//! Typed failures reported by the client.

use reqwest::StatusCode;

/// Result alias used throughout the library.
pub type Result<T, E = RenamedError> = std::result::Result<T, E>;

/// Stable discriminant for [`RenamedError`], so callers can branch without
/// inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    InsufficientCredits,
    RateLimit,
    Validation,
    NotFound,
    Server,
    Network,
    ResponseMalformed,
    JobFailed,
    Timeout,
    Cancelled,
    RequestFailed,
    Io,
}

/// Every failure the client can report. Constructed once per failed call and
/// never mutated afterwards.
#[derive(Debug, thiserror::Error)]
pub enum RenamedError {
    /// HTTP 401, or a client constructed without an API key.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// HTTP 402
    #[error("Insufficient credits: {message}")]
    InsufficientCredits { message: String },

    /// HTTP 429
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        /// Seconds the service asked us to wait, if it said.
        retry_after: Option<u64>,
    },

    /// HTTP 400
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// HTTP 404
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// HTTP 5xx
    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    /// No response was received.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A 2xx response whose body did not have the expected shape.
    #[error("Malformed response: {message}")]
    ResponseMalformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The service reported the job as failed.
    #[error("Job failed: {message}")]
    JobFailed { message: String },

    /// The poll budget ran out before the job reached a terminal state.
    #[error("Job did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    /// Any other non-2xx status.
    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: StatusCode, message: String },

    /// Reading the upload source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenamedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenamedError::Authentication { .. } => ErrorKind::Authentication,
            RenamedError::InsufficientCredits { .. } => ErrorKind::InsufficientCredits,
            RenamedError::RateLimit { .. } => ErrorKind::RateLimit,
            RenamedError::Validation { .. } => ErrorKind::Validation,
            RenamedError::NotFound { .. } => ErrorKind::NotFound,
            RenamedError::Server { .. } => ErrorKind::Server,
            RenamedError::Network(_) => ErrorKind::Network,
            RenamedError::ResponseMalformed { .. } => ErrorKind::ResponseMalformed,
            RenamedError::JobFailed { .. } => ErrorKind::JobFailed,
            RenamedError::Timeout { .. } => ErrorKind::Timeout,
            RenamedError::Cancelled => ErrorKind::Cancelled,
            RenamedError::RequestFailed { .. } => ErrorKind::RequestFailed,
            RenamedError::Io(_) => ErrorKind::Io,
        }
    }

    /// The HTTP status that produced this error, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RenamedError::Authentication { .. } => Some(StatusCode::UNAUTHORIZED),
            RenamedError::InsufficientCredits { .. } => Some(StatusCode::PAYMENT_REQUIRED),
            RenamedError::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            RenamedError::Validation { .. } => Some(StatusCode::BAD_REQUEST),
            RenamedError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            RenamedError::Server { status, .. } | RenamedError::RequestFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RenamedError::ResponseMalformed {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn decode(context: &str, source: serde_json::Error) -> Self {
        RenamedError::ResponseMalformed {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }
}
