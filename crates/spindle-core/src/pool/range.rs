//! Adaptive range splitting for log queries.
//!
//! A provider that refuses a log query as too large gets the range bisected. The left half
//! is fetched to completion before the right half, each on a freshly selected endpoint, and
//! the results are concatenated left then right, so block order is preserved. A split never
//! has more than one request of a query in flight.
//!
//! ```text
//! [100, 107] ── oversized ──► [100, 103] ─► ok
//!                             [104, 107] ── oversized ──► [104, 105] ─► ok
//!                                                         [106, 107] ─► ok
//! ```

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{EndpointPool, PoolError};
use crate::{
    types::{BlockRange, LogFilter, LogRecord},
    upstream::{classifier::FailureClass, UpstreamEndpoint},
};

impl EndpointPool {
    /// Fetches logs for `range`, splitting on oversized responses.
    ///
    /// - An empty range (`from > to`) returns no logs without contacting any endpoint.
    /// - Rate-limited failures mark the endpoint and retry the same range elsewhere.
    /// - Oversized failures on ranges wider than one block bisect the range. The halves run
    ///   one after the other, left first.
    /// - An error that is both oversized and rate-limited splits a splittable range without
    ///   penalizing the endpoint. The oversized check runs before the rate-limit check, so
    ///   only single-block ranges fall through to the rate-limit retry.
    /// - Any other failure, including an oversized single block, is returned as
    ///   [`PoolError::Endpoint`].
    ///
    /// `pinned` is used for the first attempt on the full range only; retries and halves
    /// use normal selection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Endpoint`] for fatal endpoint errors and
    /// [`PoolError::Cancelled`] if `cancel` fires.
    pub fn fetch_logs<'a>(
        &'a self,
        filter: &'a LogFilter,
        range: BlockRange,
        pinned: Option<Arc<UpstreamEndpoint>>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<LogRecord>, PoolError>> {
        async move {
            if range.is_empty() {
                return Ok(Vec::new());
            }

            let mut pinned = pinned;
            loop {
                let endpoint = match pinned.take() {
                    Some(endpoint) => endpoint,
                    None => self.select_or_cancel(cancel).await?,
                };

                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(PoolError::Cancelled),
                    result = endpoint.get_logs(filter, range) => result,
                };

                let err = match result {
                    Ok(logs) => return Ok(logs),
                    Err(err) => err,
                };

                let class = FailureClass::of(&err);

                if class.oversized {
                    if let Some((left, right)) = range.bisect() {
                        tracing::warn!(
                            endpoint = %endpoint.url(),
                            from = range.from,
                            to = range.to,
                            split_at = left.to,
                            "response too large, splitting range"
                        );
                        let mut logs = self.fetch_logs(filter, left, None, cancel).await?;
                        logs.extend(self.fetch_logs(filter, right, None, cancel).await?);
                        return Ok(logs);
                    }
                }

                if class.rate_limited {
                    endpoint.mark_error(&err);
                    continue;
                }

                tracing::error!(
                    endpoint = %endpoint.url(),
                    from = range.from,
                    to = range.to,
                    class = class.as_str(),
                    error = %err,
                    "log query failed"
                );
                return Err(PoolError::endpoint(&endpoint, err));
            }
        }
        .boxed()
    }
}
