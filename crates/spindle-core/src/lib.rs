//! # Spindle Core
//!
//! Health-aware pool of Ethereum JSON-RPC endpoints.
//!
//! This crate provides:
//!
//! - **[`upstream`]**: HTTP and WebSocket transports, the typed [`upstream::EthApi`], per-endpoint
//!   health with a fixed penalty window, and the failure classifier.
//!
//! - **[`pool`]**: Round-robin selection over healthy endpoints, retry loops for head block,
//!   receipts and block times, adaptive bisection of oversized `eth_getLogs` ranges, and
//!   quorum-verified log retrieval.
//!
//! - **[`config`]**: Layered configuration (defaults, TOML file, `SPINDLE__*` env vars).
//!
//! ## Log Retrieval Flow
//!
//! ```text
//! get_logs(filter, range, replicas)
//!       │
//!       ├─ replicas <= 1 ──► fetch_logs(range)
//!       │
//!       └─ select_endpoints(replicas)
//!              │
//!              ▼
//!        one task per replica, pinned to its endpoint
//!              │
//!              ▼
//!        fetch_logs(range) ── oversized? ──► split, both halves on any endpoint
//!              │           ── rate limited? ──► mark, reselect, retry
//!              │           ── other error? ──► fail
//!              ▼
//!        compare replicas ── differ? ──► Consistency error
//!              │
//!              ▼
//!          logs (ascending block order)
//! ```
//!
//! Every retry loop takes a [`tokio_util::sync::CancellationToken`]; cancelling it is the only
//! way to bound a loop while endpoints keep failing.

pub mod config;
pub mod pool;
pub mod types;
pub mod upstream;
pub mod utils;


pub use pool::{EndpointPool, EndpointPoolBuilder, PoolError};
