//! Health-aware endpoint pool.
//!
//! The pool owns a fixed, ordered list of endpoints and a rotation cursor. Every
//! operation picks endpoints through the same round-robin scan:
//!
//! ```text
//! cursor ──► [a] [b] [c] [d]
//!             │   │   │
//!             ▼   ▼   ▼
//!       unavailable? skip, advance
//!       available?   return it, cursor now points past it
//! ```
//!
//! The cursor advances on every scanned position, not only on the selected one. When no
//! endpoint is available the caller sleeps and rescans; selection itself never fails.
//!
//! On top of selection the pool provides:
//!
//! - [`range`]: adaptive bisection of oversized log queries
//! - [`quorum`]: log retrieval from several endpoints with a consistency check
//! - [`ops`]: retry loops for head block, receipts, block times and arbitrary operations

pub mod builder;
pub mod errors;
pub mod ops;
pub mod quorum;
pub mod range;

pub use builder::{BuilderError, EndpointPoolBuilder};
pub use errors::PoolError;
pub use quorum::{logs_match, replicas_consistent};

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{config::PoolConfig, upstream::UpstreamEndpoint};

/// Timing and mode settings shared by every pool operation.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Sleep between selection scans when no endpoint is available.
    pub selection_retry: Duration,
    /// Poll interval while waiting for enough endpoints for a quorum.
    pub multi_selection_poll: Duration,
    /// Read block timestamps from the raw block payload.
    pub manual_block_time: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            selection_retry: Duration::from_secs(15),
            multi_selection_poll: Duration::from_secs(60),
            manual_block_time: false,
        }
    }
}

struct PoolInner {
    endpoints: Vec<Arc<UpstreamEndpoint>>,
    cursor: Mutex<usize>,
    settings: PoolSettings,
}

/// Cheaply cloneable handle to a shared endpoint pool.
#[derive(Clone)]
pub struct EndpointPool {
    inner: Arc<PoolInner>,
}

impl EndpointPool {
    pub(crate) fn from_parts(endpoints: Vec<Arc<UpstreamEndpoint>>, settings: PoolSettings) -> Self {
        Self { inner: Arc::new(PoolInner { endpoints, cursor: Mutex::new(0), settings }) }
    }

    /// Builds a pool from the `[pool]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Config`] if no URL is configured, a URL is invalid, or the
    /// HTTP client cannot be created. No network activity happens before this check.
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        let mut builder = EndpointPoolBuilder::new()
            .urls(config.endpoint_urls())
            .concurrency_limit(config.concurrency_limit)
            .penalty(Duration::from_secs(config.penalty_seconds))
            .request_timeout(Duration::from_secs(config.request_timeout_seconds))
            .selection_retry(Duration::from_secs(config.selection_retry_seconds))
            .multi_selection_poll(Duration::from_secs(config.multi_selection_poll_seconds))
            .manual_block_time(config.manual_block_time);

        if let Some(proxy_url) = config.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy_url(proxy_url);
        }

        Ok(builder.build()?)
    }

    /// Number of endpoints, regardless of health.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.endpoints.is_empty()
    }

    /// All endpoints in configuration order, regardless of health.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<UpstreamEndpoint>] {
        &self.inner.endpoints
    }

    #[must_use]
    pub fn settings(&self) -> &PoolSettings {
        &self.inner.settings
    }

    /// Number of endpoints available right now.
    ///
    /// Uses [`UpstreamEndpoint::is_available`], so expired penalties are cleared as a
    /// side effect.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.inner.endpoints.iter().filter(|endpoint| endpoint.is_available()).count()
    }

    /// Returns the next available endpoint in round-robin order.
    ///
    /// Blocks (sleeping the selection retry interval between scans) until one becomes
    /// available. Never fails.
    pub async fn select_endpoint(&self) -> Arc<UpstreamEndpoint> {
        loop {
            if let Some(endpoint) = self.scan_one() {
                tracing::debug!(endpoint = %endpoint.url(), "selected endpoint");
                return endpoint;
            }

            tracing::info!(
                endpoints = self.len(),
                retry_secs = self.inner.settings.selection_retry.as_secs(),
                "no endpoint available, waiting"
            );
            tokio::time::sleep(self.inner.settings.selection_retry).await;
        }
    }

    /// Returns `n` distinct available endpoints.
    ///
    /// Waits, polling every multi-selection interval, until at least `n` endpoints are
    /// available at the same time, then collects them with the rotating scan. Each
    /// endpoint is re-checked as it is collected; if one became unavailable in between,
    /// collection continues after a selection retry sleep.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidArgument`] immediately if `n` exceeds the pool size.
    pub async fn select_endpoints(&self, n: usize) -> Result<Vec<Arc<UpstreamEndpoint>>, PoolError> {
        let size = self.len();
        if n > size {
            return Err(PoolError::InvalidArgument(format!(
                "requested {n} endpoints but the pool holds {size}"
            )));
        }

        loop {
            let available = self.available_count();
            if available >= n {
                break;
            }
            tracing::info!(
                requested = n,
                available,
                poll_secs = self.inner.settings.multi_selection_poll.as_secs(),
                "not enough endpoints available, waiting"
            );
            tokio::time::sleep(self.inner.settings.multi_selection_poll).await;
        }

        let mut selected = Vec::with_capacity(n);
        loop {
            self.scan_distinct(&mut selected, n);
            if selected.len() == n {
                return Ok(selected);
            }
            tracing::debug!(
                requested = n,
                collected = selected.len(),
                "endpoint lost availability during collection"
            );
            tokio::time::sleep(self.inner.settings.selection_retry).await;
        }
    }

    /// [`select_endpoint`](Self::select_endpoint) raced against `cancel`.
    pub(crate) async fn select_or_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<UpstreamEndpoint>, PoolError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PoolError::Cancelled),
            endpoint = self.select_endpoint() => Ok(endpoint),
        }
    }

    /// One full rotation from the cursor. The cursor moves past every position looked at.
    fn scan_one(&self) -> Option<Arc<UpstreamEndpoint>> {
        let endpoints = &self.inner.endpoints;
        let mut cursor = self.inner.cursor.lock();

        for _ in 0..endpoints.len() {
            let endpoint = &endpoints[*cursor];
            *cursor = (*cursor + 1) % endpoints.len();
            if endpoint.is_available() {
                return Some(Arc::clone(endpoint));
            }
        }
        None
    }

    /// One full rotation collecting endpoints not already in `selected`, up to `n`.
    fn scan_distinct(&self, selected: &mut Vec<Arc<UpstreamEndpoint>>, n: usize) {
        let endpoints = &self.inner.endpoints;
        let mut cursor = self.inner.cursor.lock();

        for _ in 0..endpoints.len() {
            if selected.len() == n {
                return;
            }
            let endpoint = &endpoints[*cursor];
            *cursor = (*cursor + 1) % endpoints.len();
            if selected.iter().any(|s| Arc::ptr_eq(s, endpoint)) {
                continue;
            }
            if endpoint.is_available() {
                selected.push(Arc::clone(endpoint));
            }
        }
    }
}

impl std::fmt::Debug for EndpointPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointPool")
            .field("endpoints", &self.inner.endpoints.len())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}
