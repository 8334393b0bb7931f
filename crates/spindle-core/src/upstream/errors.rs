use thiserror::Error;

/// Errors that can occur during a single call against one upstream endpoint.
///
/// The `Display` output of each variant includes the provider's message so the
/// failure classifier can match on it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error occurred (non-2xx status code).
    ///
    /// First field is the HTTP status code, second is the (truncated) response body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error returned by the upstream provider.
    ///
    /// First field is the RPC error code, second is the error message.
    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    /// Network-level error from the underlying HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response from upstream could not be parsed or was malformed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request could not be encoded before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with a `null` result for a lookup.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Raw socket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Maximum concurrent requests limit has been reached.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),
}

impl UpstreamError {
    /// Returns the JSON-RPC error code if the provider answered with an error object.
    #[must_use]
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            Self::RpcError(code, _) => Some(*code),
            _ => None,
        }
    }

    /// Returns the HTTP status if the provider answered with a non-success status.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpError(status, _) => Some(*status),
            _ => None,
        }
    }
}
