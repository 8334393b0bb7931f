//! Quorum-verified log retrieval.
//!
//! The same query runs on `k` distinct endpoints in parallel. Each replica runs the full
//! range splitter, starting on its assigned endpoint. The results are then compared as a
//! chain (replica `i` against replica `i + 1`); any difference fails the fetch.

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{EndpointPool, PoolError};
use crate::types::{BlockRange, LogFilter, LogRecord};

/// Two log lists agree iff they have the same length and, position by position, the same
/// transaction hash and log index.
#[must_use]
pub fn logs_match(a: &[LogRecord], b: &[LogRecord]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_event(y))
}

/// Chain comparison of adjacent replicas.
#[must_use]
pub fn replicas_consistent(results: &[Vec<LogRecord>]) -> bool {
    results.windows(2).all(|pair| logs_match(&pair[0], &pair[1]))
}

impl EndpointPool {
    /// Fetches logs for `range`, cross-checked across `replicas` endpoints.
    ///
    /// With `replicas <= 1` this is exactly [`fetch_logs`](Self::fetch_logs). Otherwise
    /// `replicas` distinct endpoints are selected (waiting until that many are available),
    /// one task per replica runs the range splitter pinned to its endpoint, and all tasks
    /// are awaited before comparing. Replica tasks are aborted if the returned future is
    /// dropped before completion.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidArgument`] if `replicas` exceeds the pool size
    /// - [`PoolError::Replica`] if any replica hit a fatal error (lowest failing index)
    /// - [`PoolError::Consistency`] if replicas returned different lists
    /// - [`PoolError::Cancelled`] if `cancel` fires
    pub async fn get_logs(
        &self,
        filter: &LogFilter,
        range: BlockRange,
        replicas: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogRecord>, PoolError> {
        if replicas <= 1 {
            return self.fetch_logs(filter, range, None, cancel).await;
        }

        let endpoints = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PoolError::Cancelled),
            selected = self.select_endpoints(replicas) => selected?,
        };

        if range.is_empty() {
            return Ok(Vec::new());
        }

        let urls: Vec<Arc<str>> = endpoints.iter().map(|e| Arc::clone(e.url())).collect();

        let mut tasks = JoinSet::new();
        for (index, endpoint) in endpoints.into_iter().enumerate() {
            let pool = self.clone();
            let filter = filter.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                (index, pool.fetch_logs(&filter, range, Some(endpoint), &cancel).await)
            });
        }

        let mut outcomes: Vec<Option<Result<Vec<LogRecord>, PoolError>>> =
            urls.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) =
                joined.map_err(|e| PoolError::Internal(format!("replica task: {e}")))?;
            if let Some(slot) = outcomes.get_mut(index) {
                *slot = Some(outcome);
            }
        }

        let mut results = Vec::with_capacity(replicas);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(logs)) => results.push(logs),
                Some(Err(PoolError::Cancelled)) => return Err(PoolError::Cancelled),
                Some(Err(source)) => {
                    tracing::error!(replica = index, error = %source, "quorum replica failed");
                    return Err(PoolError::Replica { index, source: Box::new(source) });
                }
                None => {
                    return Err(PoolError::Internal(format!("replica {index} produced no result")))
                }
            }
        }

        if !replicas_consistent(&results) {
            for (url, logs) in urls.iter().zip(&results) {
                tracing::info!(
                    endpoint = %url,
                    from = range.from,
                    to = range.to,
                    count = logs.len(),
                    "consistency error trace"
                );
            }
            return Err(PoolError::Consistency {
                from: range.from,
                to: range.to,
                counts: results.iter().map(Vec::len).collect(),
            });
        }

        tracing::debug!(replicas, from = range.from, to = range.to, "replicas agree");
        Ok(results.swap_remove(0))
    }
}
