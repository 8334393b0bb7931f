//! Retry loops for single-endpoint calls.

use serde_json::{json, Value};
use std::{future::Future, sync::Arc};
use tokio_util::sync::CancellationToken;

use super::{EndpointPool, PoolError};
use crate::{
    types::{Hash32, TransactionReceipt},
    upstream::{classifier, UpstreamEndpoint, UpstreamError},
    utils::hex::{format_hex_u64, parse_hex_u64},
};

/// Reads the `timestamp` member of a raw `eth_getBlockByNumber` result.
///
/// # Errors
///
/// [`UpstreamError::NotFound`] for a `null` block, [`UpstreamError::InvalidResponse`] if the
/// field is missing or not a hex quantity.
pub fn timestamp_from_raw_block(block: &Value, number: u64) -> Result<u64, UpstreamError> {
    if block.is_null() {
        return Err(UpstreamError::NotFound(format!("block {number}")));
    }
    block
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_hex_u64)
        .ok_or_else(|| {
            UpstreamError::InvalidResponse(format!("block {number} has no valid timestamp"))
        })
}

impl EndpointPool {
    /// Runs `op` against selected endpoints until it succeeds.
    ///
    /// Every failure marks the endpoint that produced it and the operation is retried on the
    /// next selection. There is no attempt cap; only `cancel` bounds the loop.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Cancelled`] once `cancel` fires.
    pub async fn run_op<T, F, Fut>(&self, mut op: F, cancel: &CancellationToken) -> Result<T, PoolError>
    where
        F: FnMut(Arc<UpstreamEndpoint>) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        loop {
            let endpoint = self.select_or_cancel(cancel).await?;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(PoolError::Cancelled),
                result = op(Arc::clone(&endpoint)) => result,
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) => endpoint.mark_error(&err),
            }
        }
    }

    /// Current head block number, retried on any error until success or cancellation.
    ///
    /// # Errors
    ///
    /// Only [`PoolError::Cancelled`].
    pub async fn latest_block_number(&self, cancel: &CancellationToken) -> Result<u64, PoolError> {
        self.run_op(|endpoint| async move { endpoint.block_number().await }, cancel).await
    }

    /// Fetches a transaction receipt.
    ///
    /// Rate-limited responses mark the endpoint and retry elsewhere. Any other failure,
    /// including a missing receipt, is returned at once.
    ///
    /// # Errors
    ///
    /// [`PoolError::Endpoint`] for a non rate-limit failure, [`PoolError::Cancelled`] if
    /// `cancel` fires.
    pub async fn transaction_receipt(
        &self,
        hash: Hash32,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, PoolError> {
        loop {
            let endpoint = self.select_or_cancel(cancel).await?;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(PoolError::Cancelled),
                result = endpoint.transaction_receipt(hash) => result,
            };

            match result {
                Ok(receipt) => return Ok(receipt),
                Err(err) if classifier::is_rate_limited(&err) => endpoint.mark_error(&err),
                Err(err) => {
                    tracing::debug!(endpoint = %endpoint.url(), tx = %hash, error = %err, "receipt lookup failed");
                    return Err(PoolError::endpoint(&endpoint, err));
                }
            }
        }
    }

    /// Unix timestamp of block `number`, retried on any error until success or cancellation.
    ///
    /// With `manual_block_time` set, the block is fetched raw and only its `timestamp`
    /// field is read.
    ///
    /// # Errors
    ///
    /// Only [`PoolError::Cancelled`].
    pub async fn block_time(&self, number: u64, cancel: &CancellationToken) -> Result<u64, PoolError> {
        if self.settings().manual_block_time {
            self.run_op(
                |endpoint| async move {
                    let block = endpoint
                        .request("eth_getBlockByNumber", json!([format_hex_u64(number), true]))
                        .await?;
                    timestamp_from_raw_block(&block, number)
                },
                cancel,
            )
            .await
        } else {
            self.run_op(
                |endpoint| async move { Ok(endpoint.block_by_number(number).await?.timestamp) },
                cancel,
            )
            .await
        }
    }
}
