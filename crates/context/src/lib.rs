//! Mutation and query contexts.
//!
//! This crate sequences calls between consumers and the injected
//! [`contract::RequestExecutor`]: mutations go through [`MutationContext`] and
//! announce themselves on the [`InvalidationBus`]; reads go through
//! [`QueryAccessor`]. [`QueryContext`] bundles both around one executor and one
//! bus, built once at startup and passed by reference (or cheap clone) to
//! whatever needs it.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** No transport or storage details live here; the executor
//! arrives already configured.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`invalidation`] | `InvalidationBus`, `InvalidationEvent`, scopes and policies |
//! | [`mutation`] | `MutationContext::on_mutate` / `try_mutate` |
//! | [`query`] | `QueryAccessor::get_data` / `try_get_data` |
//! | [`auth`] | `SessionService` (is-authenticated check), `login` |
//! | [`cache`] | `QueryCache`, an optional caching layer over `QueryAccessor` |
//!
//! Each request moves through *not started → in flight → completed with a
//! result | completed with `None`*. There are no retries and no cancellation
//! tokens; dropping the future is the only way to abandon a call.

pub mod auth;
pub mod cache;
pub mod invalidation;
pub mod mutation;
pub mod query;

use std::sync::Arc;

use contract::{CookieAccessor, Endpoint, LoginForm, LoginResponse, RequestDescriptor, RequestExecutor};
use serde::de::DeserializeOwned;

pub use auth::{login, LoginError, SessionService};
pub use cache::{QueryCache, QueryConfig, QueryResult, QueryState};
pub use invalidation::{InvalidationBus, InvalidationEvent, InvalidationPolicy, InvalidationScope};
pub use mutation::MutationContext;
pub use query::QueryAccessor;

/// The composed context: one executor, one bus, one mutation context, and one
/// query accessor.
#[derive(Clone, Debug)]
pub struct QueryContext {
    mutations: MutationContext,
    queries: QueryAccessor,
    session: SessionService,
}

impl QueryContext {
    /// Wires the contexts around `executor` with a fresh bus and the default
    /// invalidation policy.
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self::with_bus(executor, InvalidationBus::new())
    }

    /// Wires the contexts around `executor`, publishing on `bus`.
    pub fn with_bus(executor: Arc<dyn RequestExecutor>, bus: InvalidationBus) -> Self {
        Self {
            mutations: MutationContext::new(executor.clone(), bus),
            queries: QueryAccessor::new(executor.clone()),
            session: SessionService::new(executor),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: InvalidationPolicy) -> Self {
        self.mutations = self.mutations.with_policy(policy);
        self
    }

    /// See [`MutationContext::on_mutate`].
    pub async fn on_mutate<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Option<T> {
        self.mutations.on_mutate(descriptor).await
    }

    /// See [`QueryAccessor::get_data`].
    pub async fn get_data<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Option<T> {
        self.queries.get_data(endpoint).await
    }

    /// See [`auth::login`].
    pub async fn login(
        &self,
        cookies: &dyn CookieAccessor,
        form: LoginForm,
    ) -> Result<LoginResponse, LoginError> {
        auth::login(&self.mutations, cookies, form).await
    }

    pub fn mutations(&self) -> &MutationContext {
        &self.mutations
    }

    pub fn queries(&self) -> &QueryAccessor {
        &self.queries
    }

    pub fn session(&self) -> &SessionService {
        &self.session
    }

    pub fn bus(&self) -> &InvalidationBus {
        self.mutations.bus()
    }

    /// A [`QueryCache`] over this context's accessor, purged by this context's bus.
    pub fn cache(&self, config: QueryConfig) -> QueryCache {
        QueryCache::with_config(self.queries.clone(), self.bus().clone(), config)
    }
}
