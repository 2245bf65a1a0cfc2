//! The stream query capability the monitor polls.

use std::sync::Arc;

use async_trait::async_trait;
use helix_api::{HelixClient, HelixError, RateLimit, Stream, StreamsParams};
use thiserror::Error;

/// Failure of a single stream query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Helix(#[from] HelixError),
    #[error("{0}")]
    Other(String),
}

/// Source of live-stream records.
///
/// `live_streams` returns the subset of the requested channels that are
/// currently live. `rate_limit` exposes the budget reported by the most
/// recent response so the monitor can back off before the next call.
#[async_trait]
pub trait StreamQuery: Send + Sync {
    async fn live_streams(&self, params: &StreamsParams) -> Result<Vec<Stream>, QueryError>;

    fn rate_limit(&self) -> Option<RateLimit>;
}

#[async_trait]
impl StreamQuery for HelixClient {
    async fn live_streams(&self, params: &StreamsParams) -> Result<Vec<Stream>, QueryError> {
        let response = self.get_streams(params).await?;
        Ok(response.data)
    }

    fn rate_limit(&self) -> Option<RateLimit> {
        self.last_rate_limit()
    }
}

#[async_trait]
impl<T: StreamQuery + ?Sized> StreamQuery for Arc<T> {
    async fn live_streams(&self, params: &StreamsParams) -> Result<Vec<Stream>, QueryError> {
        (**self).live_streams(params).await
    }

    fn rate_limit(&self) -> Option<RateLimit> {
        (**self).rate_limit()
    }
}
