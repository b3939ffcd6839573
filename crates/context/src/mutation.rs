//! State-changing calls and the invalidation they trigger.
//!
//! A mutation is "successful" for invalidation purposes when the call
//! *completed*: a response was received and parsed, whatever its status.
//! [`InvalidationPolicy`] narrows that when a caller wants only 2xx replies to
//! purge cached reads.

use std::sync::Arc;

use contract::{NormalizedResult, RequestDescriptor, RequestError, RequestExecutor, RequestId};
use serde::de::DeserializeOwned;
use tracing::{info_span, warn, Instrument};

use crate::invalidation::{InvalidationBus, InvalidationEvent, InvalidationPolicy, InvalidationScope};

/// Sends mutations and announces them on the [`InvalidationBus`].
///
/// Clones share the executor and the bus. Calls are independent: several may
/// be in flight at once, and one call's invalidation neither waits for nor
/// cancels another.
#[derive(Clone)]
pub struct MutationContext {
    executor: Arc<dyn RequestExecutor>,
    bus: InvalidationBus,
    policy: InvalidationPolicy,
}

impl std::fmt::Debug for MutationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationContext")
            .field("bus", &self.bus)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl MutationContext {
    pub fn new(executor: Arc<dyn RequestExecutor>, bus: InvalidationBus) -> Self {
        Self {
            executor,
            bus,
            policy: InvalidationPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: InvalidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// Sends `descriptor` and decodes the normalised body into `T`.
    ///
    /// Returns `None` when the call could not complete or the body does not
    /// match `T`; the two cases are logged differently. A completed call
    /// invalidates every cached read exactly once, before decoding.
    pub async fn on_mutate<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Option<T> {
        let endpoint = descriptor.endpoint.clone();
        let result = match self.complete(descriptor, InvalidationScope::All).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%endpoint, kind = %e.kind(), error = %e, "Mutation did not complete");
                return None;
            }
        };
        let status_code = result.status_code;
        match result.decode(&endpoint) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%endpoint, status_code, error = %e, "Mutation completed but its reply did not decode");
                None
            }
        }
    }

    /// Typed form of [`MutationContext::on_mutate`].
    ///
    /// # Errors
    ///
    /// - [`RequestError::InvalidDescriptor`] for a `GET` descriptor or a body
    ///   that does not match its content type.
    /// - [`RequestError::Transport`] / [`RequestError::Parse`] from the executor.
    /// - [`RequestError::Parse`] when the body does not decode into `T`; the
    ///   invalidation has already happened in that case.
    pub async fn try_mutate<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<T, RequestError> {
        self.try_mutate_scoped(descriptor, InvalidationScope::All)
            .await
    }

    /// Like [`MutationContext::try_mutate`], invalidating only `scope`.
    pub async fn try_mutate_scoped<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
        scope: InvalidationScope,
    ) -> Result<T, RequestError> {
        let endpoint = descriptor.endpoint.clone();
        self.complete(descriptor, scope).await?.decode(&endpoint)
    }

    /// Sends the mutation and publishes on the bus if the policy allows.
    async fn complete(
        &self,
        descriptor: RequestDescriptor,
        scope: InvalidationScope,
    ) -> Result<NormalizedResult, RequestError> {
        if !descriptor.method.is_mutation() {
            return Err(RequestError::InvalidDescriptor {
                reason: format!("'{}' is a read; use the query accessor", descriptor.endpoint),
            });
        }

        let request_id = RequestId::new_random();
        let endpoint = descriptor.endpoint.clone();
        let span = info_span!("mutation", %request_id, %endpoint, method = %descriptor.method);

        async move {
            let result = self.executor.execute(descriptor).await?;
            if self.policy.should_invalidate(&result) {
                self.bus
                    .publish(InvalidationEvent::new(scope, Some(request_id)));
            }
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LogCapture, ScriptedExecutor};
    use contract::{Endpoint, FailureKind, HttpMethod, MessageResponse};
    use serde_json::{json, Value};

    fn login() -> RequestDescriptor {
        RequestDescriptor::mutation(Endpoint::new("/api/auth/login").unwrap())
            .json(json!({"email": "a@b.com", "mot_de_passe": "x"}))
    }

    fn context(executor: ScriptedExecutor) -> MutationContext {
        MutationContext::new(Arc::new(executor), InvalidationBus::new())
    }

    #[tokio::test]
    async fn completed_error_status_still_invalidates_once() {
        let ctx = context(ScriptedExecutor::replying(NormalizedResult::new(
            403,
            json!({"message": "Email non vérifié"}),
        )));
        let mut rx = ctx.bus().subscribe();

        let reply: Value = ctx.on_mutate(login()).await.unwrap();

        assert_eq!(reply, json!({"message": "Email non vérifié", "status_code": 403}));
        assert_eq!(ctx.bus().published(), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.scope, InvalidationScope::All);
        assert!(event.cause.is_some());
    }

    #[tokio::test]
    async fn failed_call_does_not_invalidate() {
        let ctx = context(ScriptedExecutor::failing(RequestError::Transport {
            endpoint: "/api/auth/login".into(),
            message: "dns error".into(),
        }));

        let reply: Option<Value> = ctx.on_mutate(login()).await;

        assert!(reply.is_none());
        assert_eq!(ctx.bus().published(), 0);
    }

    #[tokio::test]
    async fn typed_failure_kind_is_preserved() {
        let ctx = context(ScriptedExecutor::failing(RequestError::Parse {
            endpoint: "/api/auth/login".into(),
            status_code: Some(500),
            message: "expected value".into(),
        }));

        let err = ctx.try_mutate::<Value>(login()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Parse);
    }

    #[tokio::test]
    async fn decode_failure_after_completion_still_invalidates() {
        let ctx = context(ScriptedExecutor::replying(NormalizedResult::new(
            200,
            json!({"message": 12}),
        )));

        let reply: Option<MessageResponse> = ctx.on_mutate(login()).await;

        assert!(reply.is_none());
        assert_eq!(ctx.bus().published(), 1);
    }

    #[tokio::test]
    async fn decode_failure_is_logged_apart_from_incomplete_calls() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let ctx = context(ScriptedExecutor::replying(NormalizedResult::new(
            200,
            json!({"message": 12}),
        )));
        let _: Option<MessageResponse> = ctx.on_mutate(login()).await;

        let output = logs.contents();
        assert!(output.contains("reply did not decode"), "{output}");
        assert!(!output.contains("Mutation did not complete"), "{output}");

        let ctx = context(ScriptedExecutor::failing(RequestError::Transport {
            endpoint: "/api/auth/login".into(),
            message: "dns error".into(),
        }));
        let _: Option<Value> = ctx.on_mutate(login()).await;
        assert!(logs.contents().contains("Mutation did not complete"));
    }

    #[tokio::test]
    async fn success_status_policy_skips_error_replies() {
        let ctx = context(ScriptedExecutor::replying(NormalizedResult::new(
            403,
            json!({"message": "no"}),
        )))
        .with_policy(InvalidationPolicy::OnSuccessStatus);

        let reply: Option<MessageResponse> = ctx.on_mutate(login()).await;

        assert_eq!(reply.unwrap().status_code, 403);
        assert_eq!(ctx.bus().published(), 0);
    }

    #[tokio::test]
    async fn get_descriptor_is_rejected_without_a_call() {
        let executor = ScriptedExecutor::replying(NormalizedResult::new(200, json!({})));
        let calls = executor.calls();
        let ctx = context(executor);
        let descriptor = login().method(HttpMethod::Get);

        let err = ctx.try_mutate::<Value>(descriptor).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::InvalidDescriptor);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(ctx.bus().published(), 0);
    }

    #[tokio::test]
    async fn scoped_mutation_publishes_its_tags() {
        let ctx = context(ScriptedExecutor::replying(NormalizedResult::new(200, json!({}))));
        let mut rx = ctx.bus().subscribe();

        let _: Value = ctx
            .try_mutate_scoped(login(), InvalidationScope::Tags(vec!["profile".into()]))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap().scope,
            InvalidationScope::Tags(vec!["profile".into()])
        );
    }

    #[tokio::test]
    async fn concurrent_mutations_each_invalidate() {
        let ctx = context(ScriptedExecutor::replying(NormalizedResult::new(200, json!({}))));

        let (a, b, c) = tokio::join!(
            ctx.on_mutate::<Value>(login()),
            ctx.on_mutate::<Value>(login()),
            ctx.on_mutate::<Value>(login()),
        );

        assert!(a.is_some() && b.is_some() && c.is_some());
        assert_eq!(ctx.bus().published(), 3);
    }
}
