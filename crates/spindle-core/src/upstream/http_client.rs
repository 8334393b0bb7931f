use reqwest::{Client, ClientBuilder};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::upstream::UpstreamError;

/// Non-success bodies longer than this are truncated before being stored in errors.
///
/// Provider error pages carry their rate-limit wording anywhere in the page, so the cap
/// is generous; `Display` shortens the body further for logs.
const MAX_ERROR_BODY_LEN: usize = 64 * 1024;

/// Configuration for HTTP client concurrency, timeouts and outbound proxying.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent HTTP requests allowed. Callers beyond the limit wait
    /// for a permit; waiting is local back-pressure and never fails a request.
    pub concurrent_limit: usize,
    /// Outbound proxy for every HTTP endpoint. `None` disables proxying, including
    /// proxies picked up from the environment.
    pub proxy_url: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 1000,
            proxy_url: None,
        }
    }
}

/// HTTP client with semaphore-based concurrency control.
///
/// Shared by every HTTP endpoint in a pool. It performs exactly one attempt per call;
/// retrying on another endpoint is the pool's job.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

/// RAII guard ensuring semaphore permits are always released.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }

    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "permit guard dropped"
        );
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Sanitizes network errors to prevent information disclosure.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let mut builder = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(45))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("spindle/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true);

        builder = match config.proxy_url.as_deref() {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                    tracing::error!(error = %e, "invalid proxy url");
                    UpstreamError::ConnectionFailed(format!("invalid proxy url: {e}"))
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let client = builder.build().map_err(|e| {
            tracing::error!(error = %e, "failed to build http client");
            UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
        })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    /// Returns `true` if requests are routed through an outbound proxy.
    #[must_use]
    pub fn uses_proxy(&self) -> bool {
        self.config.proxy_url.is_some()
    }

    /// Sends an HTTP POST request with semaphore-based concurrency control.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if the request times out
    /// - [`UpstreamError::ConcurrencyLimit`] if the semaphore is closed
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes
    /// - [`UpstreamError::ConnectionFailed`] for connection-level failures
    /// - [`UpstreamError::Network`] if the response body cannot be read
    pub async fn send_request(
        &self,
        url: &str,
        body: bytes::Bytes,
        timeout: Duration,
    ) -> Result<bytes::Bytes, UpstreamError> {
        if self.concurrent_limit.available_permits() == 0 {
            tracing::debug!(
                limit = self.config.concurrent_limit,
                "http client at concurrency limit, waiting for a permit"
            );
        }

        // The request timeout starts once the permit is held.
        let permit = Arc::clone(&self.concurrent_limit).acquire_owned().await.map_err(|_| {
            tracing::warn!("http client semaphore closed");
            UpstreamError::ConcurrencyLimit("http client semaphore closed".to_string())
        })?;

        let permit_guard = PermitGuard::new(permit, self.concurrent_limit.clone());

        tracing::trace!(
            available_permits = permit_guard.available_permits(),
            "http request started"
        );

        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::trace!(
                    available_permits = permit_guard.available_permits(),
                    "http request error"
                );
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let result = response.bytes().await.map_err(UpstreamError::Network);
            tracing::trace!(
                available_permits = permit_guard.available_permits(),
                "http request completed"
            );
            return result;
        }

        let raw_text = response.text().await.unwrap_or_default();
        let sanitized_text = truncate_body(raw_text);
        tracing::trace!(
            status = status.as_u16(),
            available_permits = permit_guard.available_permits(),
            "http request failed"
        );
        Err(UpstreamError::HttpError(status.as_u16(), sanitized_text))
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

fn truncate_body(raw_text: String) -> String {
    if raw_text.len() <= MAX_ERROR_BODY_LEN {
        return raw_text;
    }
    let mut cut = MAX_ERROR_BODY_LEN;
    while !raw_text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (truncated)", &raw_text[..cut])
}
