//! Authenticated request client with bounded retry on transport failures.

use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::classify::{classify_response, classify_transport};
use super::retry::{RetryPolicy, with_retry};
use crate::error::{RenamedError, Result};

/// Production endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.renamed.to/api/v1";

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("renamed-rust/", env!("CARGO_PKG_VERSION"));

/// A file upload: the `file` part plus any extra form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// A multipart form is consumed by sending, so every attempt builds its own.
    fn to_form(&self) -> Form {
        let part = Part::bytes(self.bytes.clone()).file_name(self.filename.clone());
        self.fields
            .iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            })
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(Upload),
}

/// Bearer-authenticated client for the service.
///
/// Cheap to clone: the underlying reqwest `Client` shares its connection pool,
/// and the rest is immutable configuration.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a client whose every request carries `Authorization: Bearer <api_key>`.
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
            RenamedError::Authentication {
                message: "API key contains characters not allowed in a header".to_string(),
            }
        })?;
        auth_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);
        debug!("Using API key {}", mask_key(api_key));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(classify_transport)?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Resolves `path` against the base URL. Absolute URLs, such as status
    /// URLs handed out by the service, are used verbatim.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Sends a request and decodes the JSON response into `T`.
    /// Transport failures are retried per the configured policy.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<T> {
        let (_, value) = self.execute_raw(method, path, body).await?;
        serde_json::from_value(value).map_err(|e| RenamedError::decode("Unexpected response", e))
    }

    /// Sends a request and returns the status code with the parsed JSON body.
    /// Transport failures are retried per the configured policy.
    pub async fn execute_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<(StatusCode, Value)> {
        self.execute_with_headers(method, path, body, HeaderMap::new())
            .await
    }

    /// Like [`execute_raw`](Self::execute_raw), adding `headers` on top of the
    /// client's defaults.
    #[tracing::instrument(skip(self, body, headers))]
    pub async fn execute_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        headers: HeaderMap,
    ) -> Result<(StatusCode, Value)> {
        let operation = format!("{} {}", method, path);
        with_retry(self.retry, &operation, || {
            self.send(method.clone(), path, body.as_ref(), &headers)
        })
        .await
    }

    /// Performs a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Method::GET, path, None).await
    }

    /// Single attempt without retry. Non-2xx responses are classified into
    /// typed errors; an empty 2xx body decodes as `null`.
    pub async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&RequestBody>,
    ) -> Result<(StatusCode, Value)> {
        self.send(method, path, body, &HeaderMap::new()).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&RequestBody>,
        headers: &HeaderMap,
    ) -> Result<(StatusCode, Value)> {
        let url = self.url(path);
        debug!("{} {}...", method, url);

        let mut request = self.client.request(method, &url).headers(headers.clone());
        request = match body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Multipart(upload)) => request.multipart(upload.to_form()),
            None => request,
        };

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            debug!("{} responded with {}", url, status);
            return Err(classify_response(status, &text));
        }

        if text.trim().is_empty() {
            return Ok((status, Value::Null));
        }

        let value = serde_json::from_str(&text)
            .map_err(|e| RenamedError::decode("Response is not valid JSON", e))?;
        Ok((status, value))
    }
}

/// Keeps just enough of the key to tell keys apart in logs.
fn mask_key(api_key: &str) -> String {
    let prefix: String = api_key.chars().take(3).collect();
    format!("{}*********", prefix)
}
