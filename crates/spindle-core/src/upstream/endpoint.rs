use parking_lot::Mutex;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

use super::{client::EthApi, errors::UpstreamError};
use crate::types::{BlockHeader, BlockRange, Hash32, LogFilter, LogRecord, TransactionReceipt};

/// Default penalty applied by [`UpstreamEndpoint::mark_error`].
pub const DEFAULT_PENALTY: Duration = Duration::from_secs(15);

/// Health state of one endpoint.
///
/// Available iff `last_error` is `None` or the penalty window has elapsed.
#[derive(Debug, Clone)]
pub struct EndpointHealth {
    pub last_error: Option<String>,
    pub available_at: Instant,
}

/// One provider connection plus its health state machine.
///
/// The URL is the endpoint's identity and never changes. The only mutation after
/// construction is the health state, guarded by the endpoint's own lock.
pub struct UpstreamEndpoint {
    url: Arc<str>,
    api: Arc<dyn EthApi>,
    health: Mutex<EndpointHealth>,
    penalty: Duration,
}

impl UpstreamEndpoint {
    #[must_use]
    pub fn new(url: impl Into<Arc<str>>, api: Arc<dyn EthApi>, penalty: Duration) -> Self {
        Self {
            url: url.into(),
            api,
            health: Mutex::new(EndpointHealth { last_error: None, available_at: Instant::now() }),
            penalty,
        }
    }

    #[must_use]
    pub fn url(&self) -> &Arc<str> {
        &self.url
    }

    #[must_use]
    pub fn penalty(&self) -> Duration {
        self.penalty
    }

    /// Reports whether the endpoint may be used now.
    ///
    /// Observing availability after the penalty window has elapsed clears the recorded error,
    /// so this is not a pure query.
    pub fn is_available(&self) -> bool {
        let mut health = self.health.lock();
        if health.last_error.is_none() {
            return true;
        }
        if Instant::now() >= health.available_at {
            tracing::debug!(endpoint = %self.url, "endpoint penalty expired");
            health.last_error = None;
            return true;
        }
        false
    }

    /// Records a failure and makes the endpoint unavailable for the penalty window.
    ///
    /// The window restarts from now on every call; it does not grow.
    pub fn mark_error(&self, err: &UpstreamError) {
        let mut health = self.health.lock();
        health.last_error = Some(err.to_string());
        health.available_at = Instant::now() + self.penalty;
        tracing::warn!(
            endpoint = %self.url,
            error = %err,
            penalty_secs = self.penalty.as_secs(),
            "endpoint marked unavailable"
        );
    }

    /// Snapshot of the current health state.
    #[must_use]
    pub fn health(&self) -> EndpointHealth {
        self.health.lock().clone()
    }

    /// The error recorded by the last [`mark_error`](Self::mark_error), if still set.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.health.lock().last_error.clone()
    }

    pub async fn block_number(&self) -> Result<u64, UpstreamError> {
        self.api.block_number().await
    }

    pub async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, UpstreamError> {
        tracing::debug!(endpoint = %self.url, from = range.from, to = range.to, "eth_getLogs");
        self.api.get_logs(filter, range).await
    }

    pub async fn transaction_receipt(
        &self,
        hash: Hash32,
    ) -> Result<TransactionReceipt, UpstreamError> {
        self.api.transaction_receipt(hash).await
    }

    pub async fn block_by_number(&self, number: u64) -> Result<BlockHeader, UpstreamError> {
        self.api.block_by_number(number).await
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        self.api.request(method, params).await
    }
}

impl std::fmt::Debug for UpstreamEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamEndpoint")
            .field("url", &self.url)
            .field("health", &*self.health.lock())
            .finish_non_exhaustive()
    }
}
