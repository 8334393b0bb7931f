//! Core type definitions for the JSON-RPC wire format and the chain data the pool returns.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: Protocol conformance
//!
//! ## Chain Data
//! - [`Hash32`], [`Address`]: Fixed-size identifiers serialized as `0x`-prefixed hex
//! - [`LogRecord`], [`TransactionReceipt`], [`BlockHeader`]: Decoded provider responses
//!
//! ## Queries
//! - [`BlockRange`], [`LogFilter`]: Inputs to log retrieval and range splitting

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Cow, sync::Arc};

use crate::utils::hex::{format_hex_u64, quantity};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// JSON-RPC 2.0 request structure.
///
/// - `jsonrpc`: Uses `Cow<'static, str>` so construction with the static version string does
///   not allocate.
/// - `id`: Uses `Arc<serde_json::Value>` so the identifier can be matched against responses
///   without deep-copying the JSON value.
///
/// # Example
///
/// ```
/// use spindle_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("eth_blockNumber", None, json!(1));
///
/// assert_eq!(request.method, "eth_blockNumber");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id: Arc::new(id) }
    }
}

/// JSON-RPC 2.0 response structure.
///
/// A response carries either a `result` or an `error`. A `null` result deserializes to
/// `None`, which callers treat as "not found" for lookups such as receipts.
///
/// Messages without an `id` (subscription notifications on a shared socket) deserialize with
/// a `null` id so they can be skipped by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Arc<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response with zero allocation for the version string.
    #[must_use]
    pub fn success(result: serde_json::Value, id: Arc<serde_json::Value>) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Creates an error JSON-RPC response with zero allocation for the version string.
    #[must_use]
    pub fn error(code: i32, message: String, id: Arc<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message, data: None }),
            id,
        }
    }
}

/// JSON-RPC 2.0 error object.
///
/// ```
/// use spindle_core::types::JsonRpcError;
///
/// let error = JsonRpcError { code: -32005, message: "range too large".to_string(), data: None };
///
/// assert_eq!(error.code, -32005);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Error type for fixed-size hex identifier parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashParseError {
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], HashParseError> {
    let hex_str = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or(HashParseError::MissingPrefix)?;

    let bytes = hex::decode(hex_str).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;

    if bytes.len() != N {
        return Err(HashParseError::InvalidLength { expected: N, actual: bytes.len() });
    }

    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// 32-byte hash (used for transaction hashes, block hashes and log topics).
///
/// Provides `TryFrom<&str>` for idiomatic parsing of 0x-prefixed hex strings.
///
/// # Example
/// ```
/// use spindle_core::types::Hash32;
///
/// let hash: Hash32 = "0xabcd1234abcd1234abcd1234abcd1234abcd1234abcd1234abcd1234abcd1234"
///     .try_into()
///     .unwrap();
/// assert_eq!(hash.as_bytes()[0], 0xab);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// Returns the inner byte array.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<&str> for Hash32 {
    type Error = HashParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        decode_fixed::<32>(value).map(Hash32)
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(arr: [u8; 32]) -> Self {
        Hash32(arr)
    }
}

impl std::fmt::Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Hash32 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Cow::<'de, str>::deserialize(deserializer)?;
        Hash32::try_from(raw.as_ref()).map_err(serde::de::Error::custom)
    }
}

/// 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl TryFrom<&str> for Address {
    type Error = HashParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        decode_fixed::<20>(value).map(Address)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Cow::<'de, str>::deserialize(deserializer)?;
        Address::try_from(raw.as_ref()).map_err(serde::de::Error::custom)
    }
}

/// Block range for log queries
///
/// Represents an inclusive range `[from, to]`. A range with `from > to` is empty and is
/// answered without contacting any endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    #[inline]
    #[must_use]
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Returns the number of blocks in this range (inclusive), zero when empty.
    ///
    /// Saturates at `u64::MAX` for the full-width range `[0, u64::MAX]`.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.to - self.from).saturating_add(1)
        }
    }

    /// Returns true if the range contains zero blocks (`from > to`).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Splits a range spanning more than one block at its midpoint.
    ///
    /// The left half is `[from, mid]` and the right half `[mid + 1, to]` with
    /// `mid = from + (to - from) / 2`. Returns `None` for empty and single-block ranges.
    #[must_use]
    pub fn bisect(&self) -> Option<(BlockRange, BlockRange)> {
        if self.from >= self.to {
            return None;
        }
        let mid = self.from + (self.to - self.from) / 2;
        Some((BlockRange::new(self.from, mid), BlockRange::new(mid + 1, self.to)))
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Address and topic criteria for `eth_getLogs`.
///
/// Each topic position holds either `None` (wildcard) or a set of alternatives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<Address>,
    pub topics: Vec<Option<Vec<Hash32>>>,
}

impl LogFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    /// Appends a topic position matching exactly `topic`.
    #[must_use]
    pub fn topic(mut self, topic: Hash32) -> Self {
        self.topics.push(Some(vec![topic]));
        self
    }

    /// Appends a wildcard topic position.
    #[must_use]
    pub fn any_topic(mut self) -> Self {
        self.topics.push(None);
        self
    }

    /// Builds the single `eth_getLogs` parameter object for `range`.
    #[must_use]
    pub fn to_params(&self, range: BlockRange) -> serde_json::Value {
        let mut params = serde_json::Map::new();
        params.insert("fromBlock".into(), format_hex_u64(range.from).into());
        params.insert("toBlock".into(), format_hex_u64(range.to).into());

        match self.addresses.as_slice() {
            [] => {}
            [single] => {
                params.insert("address".into(), single.to_string().into());
            }
            many => {
                params.insert(
                    "address".into(),
                    many.iter().map(ToString::to_string).collect::<Vec<_>>().into(),
                );
            }
        }

        if !self.topics.is_empty() {
            let topics: Vec<serde_json::Value> = self
                .topics
                .iter()
                .map(|position| match position {
                    None => serde_json::Value::Null,
                    Some(set) => set.iter().map(ToString::to_string).collect::<Vec<_>>().into(),
                })
                .collect();
            params.insert("topics".into(), topics.into());
        }

        serde_json::Value::Object(params)
    }
}

/// One event occurrence emitted by a transaction.
///
/// Replicas are compared with [`LogRecord::same_event`], which considers only the
/// transaction hash and the log index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<Hash32>,
    #[serde(default)]
    pub data: String,
    #[serde(with = "quantity")]
    pub block_number: u64,
    pub block_hash: Hash32,
    pub transaction_hash: Hash32,
    #[serde(with = "quantity")]
    pub transaction_index: u64,
    #[serde(with = "quantity")]
    pub log_index: u64,
    #[serde(default)]
    pub removed: bool,
}

impl LogRecord {
    /// Returns true if both records identify the same event occurrence.
    #[inline]
    #[must_use]
    pub fn same_event(&self, other: &LogRecord) -> bool {
        self.transaction_hash == other.transaction_hash && self.log_index == other.log_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: Hash32,
    #[serde(with = "quantity")]
    pub transaction_index: u64,
    pub block_hash: Hash32,
    #[serde(with = "quantity")]
    pub block_number: u64,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    #[serde(with = "quantity")]
    pub cumulative_gas_used: u64,
    /// `1` for success, `0` for failure. Absent on pre-Byzantium receipts.
    #[serde(default, with = "quantity::option")]
    pub status: Option<u64>,
    #[serde(default)]
    pub logs: Vec<LogRecord>,
}

impl TransactionReceipt {
    #[must_use]
    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|status| status == 1)
    }
}

/// Header fields read from `eth_getBlockByNumber`. Other block fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    #[serde(with = "quantity")]
    pub number: u64,
    pub hash: Hash32,
    pub parent_hash: Hash32,
    #[serde(with = "quantity")]
    pub timestamp: u64,
}
