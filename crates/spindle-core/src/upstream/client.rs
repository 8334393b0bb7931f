//! Typed Ethereum JSON-RPC surface used by the pool.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use super::{
    errors::UpstreamError,
    http_client::HttpClient,
    transport::{HttpTransport, Transport},
    websocket::WsTransport,
};
use crate::{
    types::{BlockHeader, BlockRange, Hash32, JsonRpcRequest, LogFilter, LogRecord, TransactionReceipt},
    utils::hex::{format_hex_u64, parse_hex_u64},
};

/// The calls an endpoint must support.
///
/// Implemented by [`RpcClient`] for real providers; tests substitute scripted
/// implementations.
#[async_trait]
pub trait EthApi: Send + Sync {
    /// Current head block number (`eth_blockNumber`).
    async fn block_number(&self) -> Result<u64, UpstreamError>;

    /// Logs matching `filter` inside the inclusive `range` (`eth_getLogs`).
    async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, UpstreamError>;

    /// Receipt for a mined transaction. A `null` result is [`UpstreamError::NotFound`].
    async fn transaction_receipt(&self, hash: Hash32) -> Result<TransactionReceipt, UpstreamError>;

    /// Header of block `number`. A `null` result is [`UpstreamError::NotFound`].
    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, UpstreamError>;

    /// Raw call returning the untyped `result` member (`null` if absent).
    async fn request(&self, method: &str, params: Value) -> Result<Value, UpstreamError>;
}

/// JSON-RPC client over any [`Transport`].
pub struct RpcClient<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: Transport> RpcClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport, next_id: AtomicU64::new(1) }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        what: &str,
    ) -> Result<R, UpstreamError> {
        let result = self.request(method, params).await?;
        if result.is_null() {
            return Err(UpstreamError::NotFound(what.to_string()));
        }
        serde_json::from_value(result)
            .map_err(|e| UpstreamError::InvalidResponse(format!("{method}: {e}")))
    }
}

#[async_trait]
impl<T: Transport> EthApi for RpcClient<T> {
    async fn block_number(&self) -> Result<u64, UpstreamError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        result.as_str().and_then(parse_hex_u64).ok_or_else(|| {
            UpstreamError::InvalidResponse(format!("eth_blockNumber: unexpected result {result}"))
        })
    }

    async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, UpstreamError> {
        let result = self.request("eth_getLogs", json!([filter.to_params(range)])).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result)
            .map_err(|e| UpstreamError::InvalidResponse(format!("eth_getLogs: {e}")))
    }

    async fn transaction_receipt(&self, hash: Hash32) -> Result<TransactionReceipt, UpstreamError> {
        self.call("eth_getTransactionReceipt", json!([hash]), &format!("receipt {hash}")).await
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, UpstreamError> {
        self.call(
            "eth_getBlockByNumber",
            json!([format_hex_u64(number), false]),
            &format!("block {number}"),
        )
        .await
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, Some(params), json!(id));

        let response = self.transport.send(&request).await?;

        if let Some(error) = response.error {
            return Err(UpstreamError::RpcError(error.code, error.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

/// Opens a client for `url`, choosing the transport from its scheme.
///
/// `http`/`https` use the shared [`HttpClient`] (and its proxy); every other scheme gets a
/// raw socket transport.
///
/// # Errors
///
/// Returns [`UpstreamError::InvalidRequest`] if `url` does not parse.
pub fn connect(
    url: &str,
    http_client: &Arc<HttpClient>,
    request_timeout: Duration,
) -> Result<Arc<dyn EthApi>, UpstreamError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| UpstreamError::InvalidRequest(format!("invalid endpoint url {url}: {e}")))?;

    let api: Arc<dyn EthApi> = match parsed.scheme() {
        "http" | "https" => Arc::new(RpcClient::new(HttpTransport::new(
            Arc::from(url),
            Arc::clone(http_client),
            request_timeout,
        ))),
        _ => Arc::new(RpcClient::new(WsTransport::new(Arc::from(url), request_timeout))),
    };
    Ok(api)
}
