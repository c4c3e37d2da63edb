//! High-level API: account lookup, renaming and PDF splitting.

use log::{debug, info};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::error::{RenamedError, Result};
use crate::http::{DEFAULT_TIMEOUT, HttpClient, RequestBody, RetryPolicy, Upload};
use crate::job::{AsyncJob, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, StatusSource};
use crate::types::{
    JobStatusResponse, PdfSplitOptions, PdfSplitResult, RenameOptions, RenameResult, User,
};

/// Field of a submission response that carries the job's status URL.
const STATUS_URL_FIELD: &str = "statusUrl";

/// Outcome of a file submission: either the result itself, or a job to poll.
#[derive(Debug)]
pub enum Submission<T> {
    Ready(T),
    Pending(AsyncJob<T>),
}

impl<T: DeserializeOwned> Submission<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Submission::Ready(_))
    }

    pub fn into_job(self) -> Option<AsyncJob<T>> {
        match self {
            Submission::Pending(job) => Some(job),
            Submission::Ready(_) => None,
        }
    }

    /// Returns the result, polling first if the service answered with a job.
    pub async fn resolve(self) -> Result<T> {
        self.resolve_with_cancel(&CancellationToken::new(), |_| {})
            .await
    }

    pub async fn resolve_with_cancel<F>(self, cancel: &CancellationToken, on_progress: F) -> Result<T>
    where
        F: FnMut(&JobStatusResponse<T>),
    {
        match self {
            Submission::Ready(result) => Ok(result),
            Submission::Pending(mut job) => job.wait_with_cancel(cancel, on_progress).await,
        }
    }
}

/// Builder for [`RenamedClient`].
#[derive(Clone)]
pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
    timeout: Duration,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            api_key: None,
            base_url: None,
            max_retries: retry.max_retries,
            retry_delay: retry.delay,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Retries after the first attempt, for transport failures only.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll interval given to jobs created by this client.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Status-check budget given to jobs created by this client.
    pub fn max_poll_attempts(mut self, max_poll_attempts: u32) -> Self {
        self.max_poll_attempts = max_poll_attempts;
        self
    }

    pub fn build(self) -> Result<RenamedClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RenamedError::Authentication {
                message: "API key is required".to_string(),
            })?;

        let retry = RetryPolicy {
            max_retries: self.max_retries,
            delay: self.retry_delay,
        };
        let http = HttpClient::new(&api_key, self.base_url, self.timeout, retry)?;

        Ok(RenamedClient {
            http: Arc::new(http),
            poll_interval: self.poll_interval,
            max_poll_attempts: self.max_poll_attempts,
        })
    }
}

/// Client for the renamed.to API.
///
/// Cloning is cheap and clones share one connection pool, so a single client
/// can drive many jobs concurrently.
#[derive(Debug, Clone)]
pub struct RenamedClient {
    http: Arc<HttpClient>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl RenamedClient {
    /// Creates a client with default settings. Fails if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().api_key(api_key).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts
    }

    /// Returns the account the API key belongs to.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self) -> Result<User> {
        self.http.get_json("/user").await
    }

    /// Suggests a filename and folder for the document read from `reader`.
    ///
    /// Should the service hand back a job instead of an inline answer, it is
    /// polled with this client's job settings.
    #[tracing::instrument(skip(self, reader, options))]
    pub async fn rename_reader<R>(
        &self,
        reader: R,
        filename: &str,
        options: Option<&RenameOptions>,
    ) -> Result<RenameResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        let fields = options.map(RenameOptions::form_fields).unwrap_or_default();
        self.submit::<RenameResult, _>("/rename", reader, filename, fields)
            .await?
            .resolve()
            .await
    }

    /// Like [`rename_reader`](Self::rename_reader), reading from a file on disk.
    pub async fn rename_file(
        &self,
        path: impl AsRef<Path>,
        options: Option<&RenameOptions>,
    ) -> Result<RenameResult> {
        let (file, filename) = open_upload(path.as_ref()).await?;
        self.rename_reader(file, &filename, options).await
    }

    /// Submits a PDF for splitting into its constituent documents.
    ///
    /// Splitting usually runs as a job; wait on the returned
    /// [`Submission`] to get the documents.
    #[tracing::instrument(skip(self, reader, options))]
    pub async fn pdf_split_reader<R>(
        &self,
        reader: R,
        filename: &str,
        options: Option<&PdfSplitOptions>,
    ) -> Result<Submission<PdfSplitResult>>
    where
        R: AsyncRead + Unpin + Send,
    {
        let fields = options.map(PdfSplitOptions::form_fields).unwrap_or_default();
        self.submit("/pdf-split", reader, filename, fields).await
    }

    /// Like [`pdf_split_reader`](Self::pdf_split_reader), reading from a file on disk.
    pub async fn pdf_split_file(
        &self,
        path: impl AsRef<Path>,
        options: Option<&PdfSplitOptions>,
    ) -> Result<Submission<PdfSplitResult>> {
        let (file, filename) = open_upload(path.as_ref()).await?;
        self.pdf_split_reader(file, &filename, options).await
    }

    /// Builds a job handle for a status URL obtained elsewhere, using this
    /// client's job settings.
    pub fn job<T: DeserializeOwned>(&self, status_url: impl Into<String>) -> AsyncJob<T> {
        let source: Arc<dyn StatusSource> = self.http.clone();
        AsyncJob::new(source, status_url)
            .with_poll_interval(self.poll_interval)
            .with_max_attempts(self.max_poll_attempts)
    }

    /// Uploads the contents of `reader` to `path` as multipart `file`, plus
    /// `fields`, and interprets the answer.
    ///
    /// The reader is drained exactly once and dropped on every exit path.
    /// A response carrying `statusUrl` becomes a pending job; anything else
    /// must decode as `T`.
    pub async fn submit<T, R>(
        &self,
        path: &str,
        mut reader: R,
        filename: &str,
        fields: Vec<(String, String)>,
    ) -> Result<Submission<T>>
    where
        T: DeserializeOwned,
        R: AsyncRead + Unpin + Send,
    {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        drop(reader);

        info!("Uploading {} ({} bytes) to {}...", filename, bytes.len(), path);

        let mut upload = Upload::new(filename, bytes);
        upload.fields = fields;

        let (_, body) = self
            .http
            .execute_raw(Method::POST, path, Some(RequestBody::Multipart(upload)))
            .await?;

        self.interpret(body)
    }

    fn interpret<T: DeserializeOwned>(&self, body: Value) -> Result<Submission<T>> {
        if let Some(status_url) = body.get(STATUS_URL_FIELD).and_then(Value::as_str) {
            debug!("Submission accepted as job, status at {}", status_url);
            return Ok(Submission::Pending(self.job(status_url)));
        }

        serde_json::from_value(body)
            .map(Submission::Ready)
            .map_err(|e| RenamedError::decode("Response is neither a result nor a job", e))
    }
}

async fn open_upload(path: &Path) -> Result<(tokio::fs::File, String)> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RenamedError::Validation {
            message: format!("{} has no usable file name", path.display()),
        })?
        .to_string();
    let file = tokio::fs::File::open(path).await?;
    Ok((file, filename))
}
