//! Builder pattern for constructing [`EndpointPool`] with flexible configuration.

use std::{sync::Arc, time::Duration};
use thiserror::Error;

use super::{EndpointPool, PoolSettings};
use crate::upstream::{
    client,
    endpoint::DEFAULT_PENALTY,
    http_client::{HttpClient, HttpClientConfig},
    UpstreamEndpoint,
};

/// Errors that can occur during pool construction.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// HTTP client initialization failed
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(String),

    /// An endpoint URL could not be parsed
    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No endpoints were configured
    #[error("At least one endpoint is required")]
    NoEndpoints,
}

/// Builder for constructing an [`EndpointPool`].
///
/// # Examples
///
/// ```no_run
/// # use spindle_core::pool::EndpointPoolBuilder;
/// # use std::time::Duration;
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = EndpointPoolBuilder::new()
///     .urls(["https://rpc-a.example.com", "wss://rpc-b.example.com"])
///     .proxy_url("http://127.0.0.1:3128")
///     .penalty(Duration::from_secs(15))
///     .build()?;
/// assert_eq!(pool.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct EndpointPoolBuilder {
    urls: Vec<String>,
    endpoints: Vec<Arc<UpstreamEndpoint>>,
    http_config: HttpClientConfig,
    penalty: Duration,
    request_timeout: Duration,
    settings: PoolSettings,
}

impl EndpointPoolBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            urls: Vec::new(),
            endpoints: Vec::new(),
            http_config: HttpClientConfig::default(),
            penalty: DEFAULT_PENALTY,
            request_timeout: Duration::from_secs(30),
            settings: PoolSettings::default(),
        }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    #[must_use]
    pub fn urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Adds a pre-built endpoint. Endpoints added this way keep their own penalty.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Arc<UpstreamEndpoint>) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Routes HTTP endpoints through an outbound proxy.
    #[must_use]
    pub fn proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.http_config.proxy_url = Some(proxy_url.into());
        self
    }

    /// Sets HTTP client concurrency limit (default: 1000).
    #[must_use]
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.http_config.concurrent_limit = limit;
        self
    }

    /// Sets how long a failed endpoint stays unavailable (default: 15s).
    #[must_use]
    pub fn penalty(mut self, penalty: Duration) -> Self {
        self.penalty = penalty;
        self
    }

    /// Sets the timeout for methods without a dedicated timeout (default: 30s).
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the sleep between single-endpoint selection scans (default: 15s).
    #[must_use]
    pub fn selection_retry(mut self, interval: Duration) -> Self {
        self.settings.selection_retry = interval;
        self
    }

    /// Sets the poll interval while waiting for enough endpoints (default: 60s).
    #[must_use]
    pub fn multi_selection_poll(mut self, interval: Duration) -> Self {
        self.settings.multi_selection_poll = interval;
        self
    }

    /// Reads block timestamps from the raw block payload instead of decoding the header.
    #[must_use]
    pub fn manual_block_time(mut self, enabled: bool) -> Self {
        self.settings.manual_block_time = enabled;
        self
    }

    /// Builds the pool.
    ///
    /// URL endpoints come first, in the order given, followed by pre-built endpoints.
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::NoEndpoints` if neither URLs nor endpoints were provided.
    /// Returns `BuilderError::InvalidUrl` if a URL does not parse.
    /// Returns `BuilderError::HttpClientInit` if HTTP client initialization fails.
    pub fn build(self) -> Result<EndpointPool, BuilderError> {
        if self.urls.is_empty() && self.endpoints.is_empty() {
            return Err(BuilderError::NoEndpoints);
        }

        let mut endpoints = Vec::with_capacity(self.urls.len() + self.endpoints.len());

        if !self.urls.is_empty() {
            let http_client = Arc::new(
                HttpClient::with_config(self.http_config)
                    .map_err(|e| BuilderError::HttpClientInit(e.to_string()))?,
            );

            for url in self.urls {
                let api = client::connect(&url, &http_client, self.request_timeout)
                    .map_err(|e| BuilderError::InvalidUrl { url: url.clone(), reason: e.to_string() })?;
                endpoints.push(Arc::new(UpstreamEndpoint::new(url, api, self.penalty)));
            }
        }

        endpoints.extend(self.endpoints);

        tracing::info!(endpoints = endpoints.len(), "endpoint pool built");
        Ok(EndpointPool::from_parts(endpoints, self.settings))
    }
}

impl Default for EndpointPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
