//! Port traits implemented by adapter crates.
//!
//! | Trait | Implemented by |
//! |-------|----------------|
//! | [`CookieAccessor`] | `session::MemoryCookieStore`, `session::FileCookieStore` |
//! | [`RequestExecutor`] | `transport::HttpRequestExecutor` |
//!
//! Both traits are object-safe so that the composition root can hold them as
//! `Arc<dyn ...>` and inject them into the contexts.

use async_trait::async_trait;
use tracing::warn;

use crate::{CookieError, CookieName, NormalizedResult, RequestDescriptor, RequestError};

/// Named values in persisted client storage.
///
/// The executor only ever calls [`CookieAccessor::get`], once per request, with
/// [`CookieName::auth_token`]. Writes happen on login/logout, outside the core.
#[async_trait]
pub trait CookieAccessor: Send + Sync {
    /// Returns the stored value, or `None` if nothing is stored under `name`.
    async fn get(&self, name: &CookieName) -> Result<Option<String>, CookieError>;

    /// Stores `value` under `name`, replacing any previous value.
    async fn set(&self, name: &CookieName, value: String) -> Result<(), CookieError>;

    /// Removes the value stored under `name`. Removing a missing value is not an error.
    async fn delete(&self, name: &CookieName) -> Result<(), CookieError>;
}

/// Issues one authenticated request and normalises the reply.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Sends the request described by `descriptor`.
    ///
    /// Any response whose body parses as JSON is returned as `Ok`, whatever its
    /// status.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Transport`] when no response was obtained.
    /// - [`RequestError::Parse`] when the body is not valid JSON.
    /// - [`RequestError::InvalidDescriptor`] when the descriptor is rejected
    ///   before sending.
    async fn execute(&self, descriptor: RequestDescriptor) -> Result<NormalizedResult, RequestError>;

    /// Like [`RequestExecutor::execute`], but logs and swallows failures.
    ///
    /// `None` means "could not complete"; it is never an error status.
    async fn execute_or_null(&self, descriptor: RequestDescriptor) -> Option<NormalizedResult> {
        let endpoint = descriptor.endpoint.clone();
        match self.execute(descriptor).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(%endpoint, kind = %e.kind(), error = %e, "Request did not complete");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Endpoint;
    use serde_json::json;

    struct Fixed(Result<NormalizedResult, RequestError>);

    #[async_trait]
    impl RequestExecutor for Fixed {
        async fn execute(&self, _: RequestDescriptor) -> Result<NormalizedResult, RequestError> {
            self.0.clone()
        }
    }

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::query(Endpoint::new("/api/x").unwrap())
    }

    #[tokio::test]
    async fn execute_or_null_passes_results_through() {
        let executor = Fixed(Ok(NormalizedResult::new(404, json!({"error": "not found"}))));
        let result = executor.execute_or_null(descriptor()).await.unwrap();
        assert_eq!(result.status_code, 404);
    }

    #[tokio::test]
    async fn execute_or_null_swallows_failures() {
        let executor = Fixed(Err(RequestError::Transport {
            endpoint: "/api/x".into(),
            message: "unreachable".into(),
        }));
        assert!(executor.execute_or_null(descriptor()).await.is_none());
    }
}
