//! HTTP client for the hosted backend.
//!
//! Handles the `apikey`/bearer authentication pair, custom headers, timeout
//! management, exponential backoff retry, and backend error classification.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use sid_core::config::AppConfig;
use sid_core::constants;
use sid_core::error::{SidError, SidResult};

use crate::response::ApiErrorBody;

/// Retry configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// HTTP status codes that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

/// HTTP client for the hosted backend.
///
/// Wraps reqwest::Client with the backend's authentication headers, retry
/// logic, and error handling. Cloning is cheap; clones share the session token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Project URL (scheme + host, no trailing slash).
    base_url: String,
    /// Public key sent as `apikey` on every request.
    anon_key: String,
    /// Signed-in user's access token; requests fall back to the anon key.
    access_token: Arc<RwLock<Option<String>>>,
    /// Custom headers from config.
    custom_headers: Vec<(String, String)>,
    /// Default request timeout.
    timeout: Duration,
    /// Document rendering endpoint.
    render_endpoint: String,
    /// Timeout for rendering and file downloads.
    render_timeout: Duration,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a new ApiClient from application configuration.
    pub fn new(config: &AppConfig) -> SidResult<Self> {
        if !config.is_backend_configured() {
            return Err(SidError::MissingConfig(
                "backend.url and backend.anon_key must be set".into(),
            ));
        }

        let base_url = AppConfig::sanitize_backend_url(&config.backend.url);
        let timeout = Duration::from_millis(config.backend.api_timeout_ms);

        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30));

        if config.backend.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let inner = builder
            .build()
            .map_err(|e| SidError::Http(format!("failed to build HTTP client: {e}")))?;

        let mut custom_headers: Vec<(String, String)> = config
            .backend
            .custom_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        custom_headers.sort();

        let token = Some(config.session.access_token.clone()).filter(|t| !t.is_empty());

        Ok(Self {
            inner,
            base_url,
            anon_key: config.backend.anon_key.clone(),
            access_token: Arc::new(RwLock::new(token)),
            custom_headers,
            timeout,
            render_endpoint: config.effective_render_endpoint(),
            render_timeout: Duration::from_millis(config.render.timeout_ms),
            retry_config: RetryConfig::default(),
        })
    }

    /// Set custom retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Project URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn render_endpoint(&self) -> &str {
        &self.render_endpoint
    }

    pub(crate) fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    pub(crate) fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the session token used for the bearer header.
    pub async fn set_access_token(&self, token: Option<String>) {
        let mut guard = self.access_token.write().await;
        *guard = token.filter(|t| !t.is_empty());
        if guard.is_some() {
            debug!("access token set");
        } else {
            debug!("access token cleared");
        }
    }

    /// Whether a user session token is installed.
    pub async fn has_session(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    // --- URL builders ---

    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, constants::REST_PREFIX, path.trim_start_matches('/'))
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, constants::AUTH_PREFIX, path.trim_start_matches('/'))
    }

    pub(crate) fn storage_url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, constants::STORAGE_PREFIX, path.trim_start_matches('/'))
    }

    /// Append encoded query pairs to a URL.
    pub(crate) fn with_query(url: &str, pairs: &[(String, String)]) -> SidResult<String> {
        if pairs.is_empty() {
            return Ok(url.to_string());
        }
        Url::parse_with_params(url, pairs)
            .map(String::from)
            .map_err(|e| SidError::Http(format!("invalid url {url}: {e}")))
    }

    // --- Request plumbing ---

    /// Apply `apikey`, bearer token, and custom headers to a request builder.
    async fn apply_headers(&self, mut builder: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        builder = builder
            .header("apikey", self.anon_key.as_str())
            .header("Authorization", format!("Bearer {bearer}"));
        for (key, value) in &self.custom_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder
    }

    /// Internal: build a request for the given method, URL, timeout, headers and optional JSON body.
    async fn build_request(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url).timeout(timeout);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        if let Some(b) = body {
            builder = builder.json(b);
        }
        self.apply_headers(builder).await
    }

    /// Number of retries allowed for `method`. POST creates rows, runs
    /// procedures and consumes sequences, so it is sent exactly once.
    fn retries_for(&self, method: &Method) -> u32 {
        if *method == Method::POST {
            0
        } else {
            self.retry_config.max_retries
        }
    }

    /// Execute a JSON request with exponential backoff retry. Only
    /// idempotent methods are retried.
    pub(crate) async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> SidResult<Response> {
        debug!("{} {}", method, url);

        let max_retries = self.retries_for(&method);
        let mut last_error: Option<SidError> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = self.calculate_retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {:.1}s",
                    method,
                    url,
                    attempt + 1,
                    max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let builder = self
                .build_request(method.clone(), url, timeout, headers, body)
                .await;

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if self
                        .retry_config
                        .retryable_statuses
                        .contains(&status.as_u16())
                        && attempt < max_retries
                    {
                        warn!("retryable status {} from {}", status.as_u16(), url);
                        last_error = Some(SidError::ServerError {
                            status: status.as_u16(),
                            code: None,
                            message: format!("retryable status {status}"),
                        });
                        continue;
                    }

                    return Self::check_status(response).await;
                }
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
                    let err = Self::classify_error(e);

                    if is_retryable && attempt < max_retries {
                        warn!("retryable error on {}: {}", url, err);
                        last_error = Some(err);
                        continue;
                    }

                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SidError::Http("max retries exceeded".into())))
    }

    /// Send a raw byte body. Uploads are not retried.
    pub(crate) async fn send_bytes(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        bytes: Vec<u8>,
    ) -> SidResult<Response> {
        debug!("{} (bytes) {}", method, url);

        let mut builder = self
            .inner
            .request(method, url)
            .timeout(self.render_timeout)
            .body(bytes);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let builder = self.apply_headers(builder).await;

        let response = builder.send().await.map_err(Self::classify_error)?;
        Self::check_status(response).await
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(32));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    // --- Response helpers ---

    /// Deserialize a JSON response body.
    pub async fn parse_json<T: DeserializeOwned>(response: Response) -> SidResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| SidError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Deserialize a body that may be empty (`204 No Content`).
    pub async fn parse_json_or_default<T: DeserializeOwned + Default>(
        response: Response,
    ) -> SidResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| SidError::Http(format!("failed to read response: {e}")))?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| SidError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Get raw bytes from a response (for file downloads).
    pub async fn response_bytes(response: Response) -> SidResult<Vec<u8>> {
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| SidError::Http(format!("failed to read response bytes: {e}")))
    }

    /// Check the HTTP status code and convert the error envelope if needed.
    async fn check_status(response: Response) -> SidResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let envelope = ApiErrorBody::parse(&body);

        if status == StatusCode::UNAUTHORIZED && envelope.code.is_none() {
            return Err(SidError::AuthFailed(envelope.best_message()));
        }

        Err(envelope.into_error(status.as_u16()))
    }

    /// Classify a reqwest error into a SidError variant.
    fn classify_error(e: reqwest::Error) -> SidError {
        if e.is_timeout() {
            SidError::Timeout(e.to_string())
        } else if e.is_connect() {
            SidError::Http(format!("connection failed: {e}"))
        } else {
            SidError::Http(e.to_string())
        }
    }
}
