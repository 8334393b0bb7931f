//! Failure classification for endpoint call errors.
//!
//! Two independent predicates decide how the pool reacts to a failed call:
//!
//! - **rate-limited**: the endpoint is penalized and the same work is retried elsewhere
//! - **oversized response**: a multi-block log query is bisected and retried
//!
//! An error may match both or neither. Errors matching neither are fatal for the
//! operation that produced them.

use super::errors::UpstreamError;

/// Provider-specific JSON-RPC code signalling a rate limit.
pub const PROVIDER_RATE_LIMIT_CODE: i32 = -32429;

/// JSON-RPC code providers use when a log query exceeds their result cap.
pub const TOO_MANY_RESULTS_CODE: i32 = -32005;

/// Marker that must accompany [`TOO_MANY_RESULTS_CODE`] to count as an oversized response.
const RESULT_CAP_MARKER: &str = "10000";

const RATE_LIMIT_MARKERS: &[&str] = &[
    "exceeded the quota usage",
    "limit exceeded",
    "exceeded limit",
    "unable to perform request",
    "order a dedicated full node",
];

const OVERSIZED_MARKERS: &[&str] = &["limit exceeded", "range too large"];

fn contains_any(message: &str, markers: &[&str]) -> bool {
    let message = message.to_lowercase();
    markers.iter().any(|marker| message.contains(marker))
}

/// Returns `true` if `err` means the endpoint is throttling requests.
///
/// Matches HTTP 429, the provider rate-limit code, or known provider phrases
/// (case-insensitive) anywhere in the rendered error.
#[must_use]
pub fn is_rate_limited(err: &UpstreamError) -> bool {
    match err {
        UpstreamError::HttpError(429, _) | UpstreamError::RpcError(PROVIDER_RATE_LIMIT_CODE, _) => {
            true
        }
        _ => contains_any(&err.to_string(), RATE_LIMIT_MARKERS),
    }
}

/// Returns `true` if `err` means the requested block range produced too much data.
#[must_use]
pub fn is_oversized_response(err: &UpstreamError) -> bool {
    if let UpstreamError::RpcError(TOO_MANY_RESULTS_CODE, message) = err {
        if message.contains(RESULT_CAP_MARKER) {
            return true;
        }
    }
    contains_any(&err.to_string(), OVERSIZED_MARKERS)
}

/// Both predicates evaluated once, for logging and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureClass {
    pub rate_limited: bool,
    pub oversized: bool,
}

impl FailureClass {
    #[must_use]
    pub fn of(err: &UpstreamError) -> Self {
        Self { rate_limited: is_rate_limited(err), oversized: is_oversized_response(err) }
    }

    /// Neither rate-limited nor oversized.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.rate_limited && !self.oversized
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match (self.rate_limited, self.oversized) {
            (true, true) => "rate_limited_oversized",
            (true, false) => "rate_limited",
            (false, true) => "oversized",
            (false, false) => "fatal",
        }
    }
}
