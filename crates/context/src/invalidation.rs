//! Process-wide cache invalidation events.
//!
//! The [`crate::MutationContext`] publishes an [`InvalidationEvent`] after each
//! completed mutation; caching layers subscribe and purge or refetch. Events
//! are idempotent and commutative, so concurrent publishers need no
//! coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contract::{NormalizedResult, RequestId, Timestamp};
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 100;

/// Which cached reads an event covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Every cached read.
    All,
    /// Only reads registered under at least one of these tags.
    Tags(Vec<String>),
}

impl InvalidationScope {
    /// Returns `true` if a read carrying `tags` is covered by this scope.
    pub fn covers(&self, tags: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::Tags(scope) => scope.iter().any(|t| tags.contains(t)),
        }
    }
}

/// One "these reads are stale" signal.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidationEvent {
    pub scope: InvalidationScope,
    /// The mutation that caused the event, when there was one.
    pub cause: Option<RequestId>,
    pub at: Timestamp,
}

impl InvalidationEvent {
    pub fn new(scope: InvalidationScope, cause: Option<RequestId>) -> Self {
        Self {
            scope,
            cause,
            at: Timestamp::now(),
        }
    }

    /// An event covering every cached read.
    pub fn all(cause: Option<RequestId>) -> Self {
        Self::new(InvalidationScope::All, cause)
    }
}

/// When a completed mutation triggers invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Any response that was received and parsed, whatever its status.
    #[default]
    OnCompletion,
    /// Only responses with a 2xx status.
    OnSuccessStatus,
    /// Mutations never invalidate.
    Never,
}

impl InvalidationPolicy {
    pub fn should_invalidate(self, result: &NormalizedResult) -> bool {
        match self {
            Self::OnCompletion => true,
            Self::OnSuccessStatus => result.is_success(),
            Self::Never => false,
        }
    }
}

/// Broadcast channel carrying [`InvalidationEvent`]s.
///
/// Clones share the same channel. Publishing with no subscribers is not an
/// error; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    tx: broadcast::Sender<InvalidationEvent>,
    published: Arc<AtomicU64>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus whose subscribers may lag by up to `capacity` events
    /// before older ones are dropped for them.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publishes `event`, returning how many subscribers received it.
    pub fn publish(&self, event: InvalidationEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let receivers = self.tx.send(event).unwrap_or(0);
        debug!(receivers, "Invalidation published");
        receivers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.tx.subscribe()
    }

    /// Number of events published since the bus was created.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}
