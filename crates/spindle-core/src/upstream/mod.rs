//! Upstream provider access.
//!
//! This module handles everything below the pool:
//! - HTTP and WebSocket transports carrying JSON-RPC frames
//! - The typed [`EthApi`] surface and its [`RpcClient`] implementation
//! - Per-endpoint health state ([`UpstreamEndpoint`])
//! - Classification of call failures into rate-limited and oversized responses
//!
//! Transport choice follows the URL scheme: `http`/`https` use the shared [`HttpClient`],
//! anything else a lazily connected WebSocket.

pub mod classifier;
pub mod client;
pub mod endpoint;
pub mod errors;
pub mod http_client;
pub mod transport;
pub mod websocket;

pub use classifier::{is_oversized_response, is_rate_limited, FailureClass};
pub use client::{connect, EthApi, RpcClient};
pub use endpoint::{EndpointHealth, UpstreamEndpoint};
pub use errors::UpstreamError;
pub use http_client::{HttpClient, HttpClientConfig};
pub use transport::{HttpTransport, Transport};
pub use websocket::WsTransport;
