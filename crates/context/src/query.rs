//! Read-only calls.
//!
//! [`QueryAccessor`] holds no cache. Deduplication and invalidation handling
//! belong to whatever caching layer wraps it (see [`crate::QueryCache`]).

use std::sync::Arc;

use contract::{Endpoint, NormalizedResult, RequestDescriptor, RequestError, RequestExecutor};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Issues `GET` requests through the shared executor.
#[derive(Clone)]
pub struct QueryAccessor {
    executor: Arc<dyn RequestExecutor>,
}

impl std::fmt::Debug for QueryAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAccessor").finish_non_exhaustive()
    }
}

impl QueryAccessor {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Fetches `endpoint` and decodes the normalised body into `T`.
    ///
    /// `None` means the fetch failed; it never means "not cached".
    pub async fn get_data<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Option<T> {
        let result = match self.fetch(endpoint).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%endpoint, kind = %e.kind(), error = %e, "Query did not complete");
                return None;
            }
        };
        let status_code = result.status_code;
        match result.decode(endpoint) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%endpoint, status_code, error = %e, "Query completed but its reply did not decode");
                None
            }
        }
    }

    /// Typed form of [`QueryAccessor::get_data`].
    ///
    /// # Errors
    ///
    /// [`RequestError::Transport`] or [`RequestError::Parse`] from the executor,
    /// or [`RequestError::Parse`] when the body does not decode into `T`.
    pub async fn try_get_data<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<T, RequestError> {
        self.fetch(endpoint).await?.decode(endpoint)
    }

    async fn fetch(&self, endpoint: &Endpoint) -> Result<NormalizedResult, RequestError> {
        self.executor
            .execute(RequestDescriptor::query(endpoint.clone()))
            .await
    }
}
