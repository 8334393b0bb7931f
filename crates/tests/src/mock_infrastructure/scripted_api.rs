//! In-memory [`EthApi`] driven by closures.
//!
//! Used where mockito cannot help: paused-clock tests and pools with many endpoints that
//! must answer differently to the same range.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use spindle_core::{
    types::{Address, BlockHeader, BlockRange, Hash32, LogFilter, LogRecord, TransactionReceipt},
    upstream::{EthApi, UpstreamEndpoint, UpstreamError},
    EndpointPool, EndpointPoolBuilder,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

type LogsFn = dyn Fn(BlockRange) -> Result<Vec<LogRecord>, UpstreamError> + Send + Sync;
type BlockNumberFn = dyn Fn(usize) -> Result<u64, UpstreamError> + Send + Sync;

/// Scripted endpoint. Each call counts towards [`ScriptedApi::calls`].
pub struct ScriptedApi {
    logs: Box<LogsFn>,
    block_number: Box<BlockNumberFn>,
    calls: AtomicUsize,
    ranges: Mutex<Vec<BlockRange>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self {
            logs: Box::new(|range| Ok(logs_for(range))),
            block_number: Box::new(|_| Ok(1)),
            calls: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedApi {
    #[must_use]
    pub fn logs(
        script: impl Fn(BlockRange) -> Result<Vec<LogRecord>, UpstreamError> + Send + Sync + 'static,
    ) -> Self {
        Self { logs: Box::new(script), ..Self::default() }
    }

    /// `script` receives the zero-based index of the call.
    #[must_use]
    pub fn block_number(
        script: impl Fn(usize) -> Result<u64, UpstreamError> + Send + Sync + 'static,
    ) -> Self {
        Self { block_number: Box::new(script), ..Self::default() }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn ranges(&self) -> Vec<BlockRange> {
        self.ranges.lock().clone()
    }
}

#[async_trait]
impl EthApi for ScriptedApi {
    async fn block_number(&self) -> Result<u64, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.block_number)(call)
    }

    async fn get_logs(
        &self,
        _filter: &LogFilter,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().push(range);
        tracing::debug!(%range, "scripted eth_getLogs");
        (self.logs)(range)
    }

    async fn transaction_receipt(&self, hash: Hash32) -> Result<TransactionReceipt, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::NotFound(format!("receipt {hash}")))
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::NotFound(format!("block {number}")))
    }

    async fn request(&self, _method: &str, _params: Value) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    }
}

/// A log uniquely identified by its block number.
#[must_use]
pub fn log_at(block: u64) -> LogRecord {
    let mut tx = [0u8; 32];
    tx[24..].copy_from_slice(&block.to_be_bytes());
    LogRecord {
        address: Address([0x01; 20]),
        topics: Vec::new(),
        data: "0x".to_string(),
        block_number: block,
        block_hash: Hash32([0x02; 32]),
        transaction_hash: Hash32(tx),
        transaction_index: 0,
        log_index: 0,
        removed: false,
    }
}

#[must_use]
pub fn logs_for(range: BlockRange) -> Vec<LogRecord> {
    (range.from..=range.to).map(log_at).collect()
}

/// Provider refusal for ranges wider than `max_blocks`.
pub fn too_many_results(range: BlockRange, max_blocks: u64) -> Result<Vec<LogRecord>, UpstreamError> {
    if range.len() > max_blocks {
        Err(UpstreamError::RpcError(-32005, "query returned more than 10000 results".into()))
    } else {
        Ok(logs_for(range))
    }
}

/// Pool over `apis` named `scripted://0..n`, using the default intervals.
#[must_use]
pub fn scripted_pool(apis: &[Arc<ScriptedApi>]) -> EndpointPool {
    scripted_pool_with(apis, EndpointPoolBuilder::new())
}

/// Pool over `apis` on top of an already configured builder.
#[must_use]
pub fn scripted_pool_with(apis: &[Arc<ScriptedApi>], builder: EndpointPoolBuilder) -> EndpointPool {
    apis.iter()
        .enumerate()
        .fold(builder, |builder, (i, api)| {
            let api: Arc<dyn EthApi> = Arc::clone(api) as Arc<dyn EthApi>;
            builder.endpoint(Arc::new(UpstreamEndpoint::new(
                format!("scripted://{i}"),
                api,
                Duration::from_secs(15),
            )))
        })
        .build()
        .expect("scripted pool")
}
