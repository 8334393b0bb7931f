//! RPC Mock Builder for Ethereum JSON-RPC Testing
//!
//! Wraps mockito to provide Ethereum-specific response builders for the methods the pool
//! calls. Matchers are kept disjoint (method plus block range) so the order in which mocks
//! are registered never decides which one answers.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::{io::Write, time::Duration};

/// Message used by providers that cap `eth_getLogs` at 10000 results.
pub const TOO_MANY_RESULTS_MESSAGE: &str = "query returned more than 10000 results";

/// Builder for creating mock Ethereum RPC responses.
///
/// Uses mockito internally but provides Ethereum-specific helpers.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
    response_delay: Option<Duration>,
}

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
}

fn range_matcher(from_block: u64, to_block: u64) -> Matcher {
    Matcher::AllOf(vec![
        method_matcher("eth_getLogs"),
        Matcher::Regex(format!(r#""fromBlock"\s*:\s*"0x{from_block:x}""#)),
        Matcher::Regex(format!(r#""toBlock"\s*:\s*"0x{to_block:x}""#)),
    ])
}

fn result_body(result: &Value) -> String {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
}

fn error_body(code: i32, message: &str) -> String {
    json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": code, "message": message } })
        .to_string()
}

impl RpcMockBuilder {
    /// Creates a new RPC mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new(), response_delay: None }
    }

    /// Delays the body of every mock registered after this call.
    pub fn with_response_delay(&mut self, delay: Duration) -> &mut Self {
        self.response_delay = Some(delay);
        self
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    async fn push(&mut self, matcher: Matcher, status: usize, body: String) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(matcher)
            .with_status(status)
            .with_header("content-type", "application/json");

        let mock = match self.response_delay {
            Some(delay) => mock.with_chunked_body(move |writer| {
                std::thread::sleep(delay);
                writer.write_all(body.as_bytes())
            }),
            None => mock.with_body(body),
        };
        let mock = mock.create_async().await;

        self.mocks.push(mock);
        self
    }

    /// Mocks an `eth_blockNumber` request.
    pub async fn mock_block_number(&mut self, block_number: u64) -> &mut Self {
        let body = result_body(&json!(format!("0x{block_number:x}")));
        self.push(method_matcher("eth_blockNumber"), 200, body).await
    }

    /// Mocks an `eth_getLogs` request with specific from/to blocks.
    pub async fn mock_get_logs_for_range(
        &mut self,
        from_block: u64,
        to_block: u64,
        logs: &[Value],
    ) -> &mut Self {
        let body = result_body(&json!(logs));
        self.push(range_matcher(from_block, to_block), 200, body).await
    }

    /// Mocks an `eth_getLogs` request that the provider refuses as too large.
    pub async fn mock_logs_too_large_for_range(
        &mut self,
        from_block: u64,
        to_block: u64,
    ) -> &mut Self {
        let body = error_body(-32005, TOO_MANY_RESULTS_MESSAGE);
        self.push(range_matcher(from_block, to_block), 200, body).await
    }

    /// Mocks an `eth_getBlockByNumber` request.
    pub async fn mock_get_block_by_number(&mut self, block_number: u64, response: &Value) -> &mut Self {
        let matcher = Matcher::Regex(format!(
            r#""method"\s*:\s*"eth_getBlockByNumber".*"params"\s*:\s*\["0x{block_number:x}""#
        ));
        self.push(matcher, 200, result_body(response)).await
    }

    /// Mocks a generic JSON-RPC method with custom response.
    pub async fn mock_method(&mut self, method: &str, result: &Value) -> &mut Self {
        self.push(method_matcher(method), 200, result_body(result)).await
    }

    /// Mocks an RPC error response.
    pub async fn mock_rpc_error(&mut self, method: &str, code: i32, message: &str) -> &mut Self {
        self.push(method_matcher(method), 200, error_body(code, message)).await
    }

    /// Mocks an HTTP 429 for `method`.
    pub async fn mock_rate_limited(&mut self, method: &str) -> &mut Self {
        self.push(method_matcher(method), 429, "Too Many Requests".to_string()).await
    }

    /// Verifies all mocks were called.
    #[must_use]
    pub fn verify_all_called(&self) -> bool {
        self.mocks.iter().all(mockito::Mock::matched)
    }
}

/// Builder for constructing block responses.
pub struct BlockResponseBuilder {
    number: u64,
    timestamp: u64,
}

impl BlockResponseBuilder {
    /// Creates a new block response builder.
    #[must_use]
    pub fn new(number: u64) -> Self {
        Self { number, timestamp: 1_600_000_000 + number }
    }

    /// Sets a custom timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builds the block response JSON, including fields the header type ignores.
    #[must_use]
    pub fn build(self) -> Value {
        json!({
            "number": format!("0x{:x}", self.number),
            "hash": format!("0x{:064x}", self.number),
            "parentHash": format!("0x{:064x}", self.number.saturating_sub(1)),
            "timestamp": format!("0x{:x}", self.timestamp),
            "transactions": [],
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x5208",
            "baseFeePerGas": "0x7",
            "miner": "0x0000000000000000000000000000000000000000"
        })
    }
}

/// Builder for constructing log responses.
pub struct LogResponseBuilder {
    address: String,
    block_number: u64,
    log_index: u64,
    transaction_hash: String,
    topics: Vec<String>,
}

impl LogResponseBuilder {
    /// Creates a new log response builder.
    #[must_use]
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            block_number,
            log_index,
            transaction_hash: format!("0x{:064x}", block_number * 100 + log_index),
            topics: vec![format!("0x{:064x}", 0)],
        }
    }

    /// Sets a custom contract address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Builds the log response JSON.
    #[must_use]
    pub fn build(self) -> Value {
        json!({
            "address": self.address,
            "blockNumber": format!("0x{:x}", self.block_number),
            "blockHash": format!("0x{:064x}", self.block_number),
            "logIndex": format!("0x{:x}", self.log_index),
            "transactionHash": self.transaction_hash,
            "transactionIndex": "0x0",
            "topics": self.topics,
            "data": "0x",
            "removed": false
        })
    }
}

/// One log per block in `[from, to]`.
#[must_use]
pub fn logs_in_range(from: u64, to: u64) -> Vec<Value> {
    (from..=to).map(|block| LogResponseBuilder::new(block, 0).build()).collect()
}

/// A successful receipt for `hash`.
#[must_use]
pub fn receipt_json(hash: &str, block_number: u64) -> Value {
    json!({
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": format!("0x{block_number:064x}"),
        "blockNumber": format!("0x{block_number:x}"),
        "from": "0x00000000000000000000000000000000000000aa",
        "to": "0x00000000000000000000000000000000000000bb",
        "contractAddress": null,
        "gasUsed": "0x5208",
        "cumulativeGasUsed": "0x5208",
        "status": "0x1",
        "logs": []
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rpc_mock_builder_creation() {
        let mock = RpcMockBuilder::new().await;
        assert!(!mock.url().is_empty());
    }

    #[test]
    fn test_block_response_builder() {
        let block = BlockResponseBuilder::new(100).with_timestamp(0x10).build();
        assert_eq!(block["number"], "0x64");
        assert_eq!(block["timestamp"], "0x10");
    }

    #[test]
    fn test_log_response_builder() {
        let log = LogResponseBuilder::new(100, 5).with_address("0x00000000000000000000000000000000000000cc").build();
        assert_eq!(log["blockNumber"], "0x64");
        assert_eq!(log["logIndex"], "0x5");
        assert_eq!(log["address"], "0x00000000000000000000000000000000000000cc");
    }

    #[test]
    fn test_logs_in_range() {
        let logs = logs_in_range(7, 9);
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[2]["blockNumber"], "0x9");
    }
}
