//! JSON-RPC over HTTP against mockito servers.
//!
//! These tests exercise the real transport stack: request encoding, HTTP status and
//! JSON-RPC error mapping, and pool failover between live endpoints.

use crate::mock_infrastructure::{
    logs_in_range, receipt_json, BlockResponseBuilder, RpcMockBuilder,
};
use serde_json::Value;
use spindle_core::{
    types::{BlockRange, Hash32, LogFilter},
    upstream::{self, classifier, HttpClient, UpstreamError},
    EndpointPool, EndpointPoolBuilder, PoolError,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

fn http_client() -> Arc<HttpClient> {
    Arc::new(HttpClient::new().unwrap())
}

fn pool(urls: &[String]) -> EndpointPool {
    EndpointPoolBuilder::new().urls(urls.iter().cloned()).build().unwrap()
}

#[tokio::test]
async fn test_block_number_over_http() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_block_number(0x1234).await;

    let api = upstream::connect(&mock.url(), &http_client(), Duration::from_secs(5)).unwrap();

    assert_eq!(api.block_number().await.unwrap(), 0x1234);
    assert!(mock.verify_all_called());
}

#[tokio::test]
async fn test_rpc_error_object_is_mapped() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rpc_error("eth_getTransactionReceipt", -32000, "header not found").await;

    let api = upstream::connect(&mock.url(), &http_client(), Duration::from_secs(5)).unwrap();
    let err = api.transaction_receipt(TX_HASH.parse().unwrap()).await.unwrap_err();

    match err {
        UpstreamError::RpcError(code, message) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "header not found");
        }
        other => panic!("expected RPC error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_429_is_rate_limited() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rate_limited("eth_blockNumber").await;

    let api = upstream::connect(&mock.url(), &http_client(), Duration::from_secs(5)).unwrap();
    let err = api.block_number().await.unwrap_err();

    assert_eq!(err.http_status(), Some(429));
    assert!(classifier::is_rate_limited(&err));
    assert!(!classifier::is_oversized_response(&err));
}

#[tokio::test]
async fn test_null_receipt_is_not_found() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_method("eth_getTransactionReceipt", &Value::Null).await;

    let api = upstream::connect(&mock.url(), &http_client(), Duration::from_secs(5)).unwrap();
    let err = api.transaction_receipt(TX_HASH.parse().unwrap()).await.unwrap_err();

    assert!(matches!(err, UpstreamError::NotFound(_)));
}

#[tokio::test]
async fn test_receipt_fails_over_on_rate_limit() {
    let mut limited = RpcMockBuilder::new().await;
    limited.mock_rate_limited("eth_getTransactionReceipt").await;
    let mut healthy = RpcMockBuilder::new().await;
    healthy.mock_method("eth_getTransactionReceipt", &receipt_json(TX_HASH, 100)).await;

    let pool = pool(&[limited.url(), healthy.url()]);
    let hash: Hash32 = TX_HASH.parse().unwrap();

    let receipt = pool.transaction_receipt(hash, &CancellationToken::new()).await.unwrap();

    assert_eq!(receipt.transaction_hash, hash);
    assert_eq!(receipt.block_number, 100);
    assert_eq!(receipt.succeeded(), Some(true));
    assert!(pool.endpoints()[0].last_error().is_some(), "rate-limited endpoint is penalized");
    assert!(limited.verify_all_called());
}

#[tokio::test]
async fn test_receipt_fatal_error_names_endpoint() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_rpc_error("eth_getTransactionReceipt", -32000, "header not found").await;

    let pool = pool(&[mock.url()]);
    let err = pool
        .transaction_receipt(TX_HASH.parse().unwrap(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        PoolError::Endpoint { endpoint, source } => {
            assert_eq!(&*endpoint, mock.url());
            assert!(matches!(source, UpstreamError::RpcError(-32000, _)));
        }
        other => panic!("expected endpoint error, got {other:?}"),
    }
    assert!(pool.endpoints()[0].is_available());
}

#[tokio::test]
async fn test_latest_block_number_skips_rate_limited_endpoint() {
    let mut limited = RpcMockBuilder::new().await;
    limited.mock_rate_limited("eth_blockNumber").await;
    let mut healthy = RpcMockBuilder::new().await;
    healthy.mock_block_number(77).await;

    let pool = pool(&[limited.url(), healthy.url()]);

    assert_eq!(pool.latest_block_number(&CancellationToken::new()).await.unwrap(), 77);
    assert_eq!(pool.available_count(), 1);
}

#[tokio::test]
async fn test_block_time_typed() {
    let mut mock = RpcMockBuilder::new().await;
    let block = BlockResponseBuilder::new(100).with_timestamp(1_700_000_000).build();
    mock.mock_get_block_by_number(100, &block).await;

    let pool = pool(&[mock.url()]);

    assert_eq!(pool.block_time(100, &CancellationToken::new()).await.unwrap(), 1_700_000_000);
}

#[tokio::test]
async fn test_block_time_manual_reads_raw_timestamp() {
    let mut mock = RpcMockBuilder::new().await;
    // only the timestamp is usable; the rest would not decode as a header
    let block = serde_json::json!({ "number": "pending", "timestamp": "0x5f5e1000" });
    mock.mock_get_block_by_number(100, &block).await;

    let pool = EndpointPoolBuilder::new().url(mock.url()).manual_block_time(true).build().unwrap();

    assert_eq!(pool.block_time(100, &CancellationToken::new()).await.unwrap(), 0x5f5e_1000);
}

#[tokio::test]
async fn test_get_logs_over_http() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_get_logs_for_range(16, 32, &logs_in_range(16, 32)).await;

    let pool = pool(&[mock.url()]);
    let logs = pool
        .get_logs(&LogFilter::new(), BlockRange::new(16, 32), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(logs.len(), 17);
    assert!(logs.windows(2).all(|w| w[0].block_number < w[1].block_number));
    assert!(mock.verify_all_called());
}

#[test]
fn test_invalid_url_rejected_before_network() {
    let err = EndpointPoolBuilder::new().url("not a url").build().unwrap_err();
    assert!(err.to_string().contains("not a url"));
}
