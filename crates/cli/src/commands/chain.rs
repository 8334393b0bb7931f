use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};
use spindle_core::{types::Hash32, EndpointPool};
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct EndpointStatus<'a> {
    url: &'a str,
    available: bool,
    last_error: Option<String>,
}

pub async fn latest_block(pool: &EndpointPool, cancel: &CancellationToken) -> anyhow::Result<Value> {
    let number = pool.latest_block_number(cancel).await?;
    Ok(json!({ "blockNumber": number }))
}

pub async fn receipt(
    pool: &EndpointPool,
    hash: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<Value> {
    let hash: Hash32 = hash.parse().with_context(|| format!("invalid transaction hash {hash}"))?;
    let receipt = pool.transaction_receipt(hash, cancel).await?;
    Ok(serde_json::to_value(receipt)?)
}

pub async fn block_time(
    pool: &EndpointPool,
    number: u64,
    cancel: &CancellationToken,
) -> anyhow::Result<Value> {
    let timestamp = pool.block_time(number, cancel).await?;
    Ok(json!({ "blockNumber": number, "timestamp": timestamp }))
}

pub fn endpoints(pool: &EndpointPool) -> Value {
    let statuses: Vec<_> = pool
        .endpoints()
        .iter()
        .map(|endpoint| EndpointStatus {
            url: endpoint.url(),
            available: endpoint.is_available(),
            last_error: endpoint.last_error(),
        })
        .collect();
    json!(statuses)
}
