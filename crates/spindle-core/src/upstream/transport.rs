//! JSON-RPC transports.
//!
//! A [`Transport`] moves one encoded request to a provider and returns the decoded
//! envelope. It does not interpret the `error` member; that is [`RpcClient`]'s job.
//!
//! [`RpcClient`]: super::client::RpcClient

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use super::{errors::UpstreamError, http_client::HttpClient};
use crate::types::{JsonRpcRequest, JsonRpcResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and waits for its response envelope.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] if the request cannot be delivered or the response
    /// cannot be decoded.
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError>;
}

/// HTTP(S) transport over the pool's shared [`HttpClient`].
pub struct HttpTransport {
    url: Arc<str>,
    http_client: Arc<HttpClient>,
    default_timeout: Duration,
}

impl HttpTransport {
    #[must_use]
    pub fn new(url: Arc<str>, http_client: Arc<HttpClient>, default_timeout: Duration) -> Self {
        Self { url, http_client, default_timeout }
    }

    /// Returns the timeout duration for a given RPC method.
    ///
    /// Fast methods like `eth_blockNumber` get 5s, point lookups get 10s,
    /// and `eth_getLogs` gets 30s due to potentially large result sets.
    fn timeout_for_method(&self, method: &str) -> Duration {
        match method {
            "eth_blockNumber" | "eth_chainId" => Duration::from_secs(5),
            "eth_getBlockByNumber" | "eth_getTransactionReceipt" => Duration::from_secs(10),
            "eth_getLogs" => Duration::from_secs(30),
            _ => self.default_timeout,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> {
        let body = serde_json::to_vec(request).map_err(|e| {
            UpstreamError::InvalidRequest(format!("Failed to serialize request: {e}"))
        })?;

        let response_bytes = self
            .http_client
            .send_request(
                &self.url,
                bytes::Bytes::from(body),
                self.timeout_for_method(&request.method),
            )
            .await?;

        serde_json::from_slice(&response_bytes)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Invalid JSON: {e}")))
    }
}
