use std::sync::Arc;
use thiserror::Error;

use super::builder::BuilderError;
use crate::upstream::{UpstreamEndpoint, UpstreamError};

/// Errors returned by pool operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PoolError {
    /// Caller asked for something the pool can never satisfy.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Pool construction failed before any network activity.
    #[error("Configuration error: {0}")]
    Config(#[from] BuilderError),

    /// A fatal (non-retryable) failure from one endpoint.
    #[error("Endpoint {endpoint} failed: {source}")]
    Endpoint {
        endpoint: Arc<str>,
        #[source]
        source: UpstreamError,
    },

    /// One quorum replica failed, failing the whole fetch.
    #[error("Replica {index} failed: {source}")]
    Replica {
        index: usize,
        #[source]
        source: Box<PoolError>,
    },

    /// Quorum replicas returned different log lists.
    #[error("Consistency error: replicas disagree on logs for blocks [{from}, {to}] (counts {counts:?})")]
    Consistency { from: u64, to: u64, counts: Vec<usize> },

    /// The caller's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// A spawned replica task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Wraps a fatal call error with the identity of the endpoint that produced it.
    #[must_use]
    pub fn endpoint(endpoint: &UpstreamEndpoint, source: UpstreamError) -> Self {
        Self::Endpoint { endpoint: Arc::clone(endpoint.url()), source }
    }

    /// Returns the underlying endpoint error, looking through replica wrappers.
    #[must_use]
    pub fn upstream_error(&self) -> Option<&UpstreamError> {
        match self {
            Self::Endpoint { source, .. } => Some(source),
            Self::Replica { source, .. } => source.upstream_error(),
            _ => None,
        }
    }
}
