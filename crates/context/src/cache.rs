//! Reference caching layer for reads.
//!
//! [`QueryCache`] wraps a [`QueryAccessor`] the way a UI query library would:
//! results are cached per key, fresh entries are served without I/O, and
//! events from the [`InvalidationBus`] mark entries stale so the next read
//! refetches. It is optional; the accessor works without it.
//!
//! # Example
//!
//! ```rust,ignore
//! let cache = QueryCache::new(ctx.queries().clone(), ctx.bus().clone());
//! let _listener = cache.listen();
//!
//! let activity = cache.fetch("activity", &endpoint).await;
//! ctx.on_mutate::<Value>(upload).await; // marks "activity" stale
//! let refreshed = cache.fetch("activity", &endpoint).await; // refetches
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use contract::Endpoint;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::invalidation::{InvalidationBus, InvalidationEvent};
use crate::QueryAccessor;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How long cached reads stay fresh and how long they are kept at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Age after which an entry is stale and the next read refetches.
    pub stale_time: Duration,
    /// Age after which [`QueryCache::evict_expired`] drops an entry.
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(0),      // immediately stale
            cache_time: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

impl QueryConfig {
    #[must_use]
    pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// State of a cached read as seen by a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// A fetch is in progress and nothing usable is cached.
    Loading,
    Success {
        data: T,
        /// The data is served from cache but a refetch is due.
        is_stale: bool,
    },
    /// The fetch did not complete. Distinct from "nothing cached yet".
    Error(String),
}

/// A keyed [`QueryState`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub key: String,
    pub state: QueryState<T>,
}

impl<T> QueryResult<T> {
    fn loading(key: String) -> Self {
        Self {
            key,
            state: QueryState::Loading,
        }
    }

    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }

    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }
}

// ---------------------------------------------------------------------------
// Cache entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    tags: Vec<String>,
    timestamp: Instant,
    is_stale: bool,
}

impl CacheEntry {
    fn new(data: Value, tags: Vec<String>) -> Self {
        Self {
            data,
            tags,
            timestamp: Instant::now(),
            is_stale: false,
        }
    }

    fn check_staleness(&mut self, stale_time: Duration) -> bool {
        if self.timestamp.elapsed() > stale_time {
            self.is_stale = true;
        }
        self.is_stale
    }

    fn should_gc(&self, cache_time: Duration) -> bool {
        self.timestamp.elapsed() > cache_time
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Keyed cache of JSON reads, purged by invalidation events.
///
/// Clones share the same entries. Listener tasks and [`QueryCache::watch`]
/// streams hold only a weak handle, so they end once the last clone is
/// dropped even while the bus lives on.
#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    entries: DashMap<String, CacheEntry>,
    queries: QueryAccessor,
    bus: InvalidationBus,
    config: QueryConfig,
    /// Bumped by every applied invalidation.
    generation: AtomicU64,
    /// Never sent on; dropping it wakes every listener and stream.
    closed: watch::Sender<()>,
}

impl QueryCache {
    pub fn new(queries: QueryAccessor, bus: InvalidationBus) -> Self {
        Self::with_config(queries, bus, QueryConfig::default())
    }

    pub fn with_config(queries: QueryAccessor, bus: InvalidationBus, config: QueryConfig) -> Self {
        let (closed, _) = watch::channel(());
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                queries,
                bus,
                config,
                generation: AtomicU64::new(0),
                closed,
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Returns the cached state for `key` without any I/O.
    pub fn get(&self, key: &str) -> Option<QueryResult<Value>> {
        let mut entry = self.inner.entries.get_mut(key)?;
        let is_stale = entry.check_staleness(self.inner.config.stale_time);
        Some(QueryResult {
            key: key.to_owned(),
            state: QueryState::Success {
                data: entry.data.clone(),
                is_stale,
            },
        })
    }

    /// Reads `endpoint` under `key`, serving fresh cached data without I/O.
    pub async fn fetch(&self, key: &str, endpoint: &Endpoint) -> QueryResult<Value> {
        self.fetch_tagged(key, endpoint, &[]).await
    }

    /// Like [`QueryCache::fetch`], registering `tags` for scoped invalidation.
    ///
    /// A failed fetch yields [`QueryState::Error`] and leaves any previous
    /// entry in place; failures are never cached. A result whose fetch
    /// overlapped an applied invalidation is cached as stale, since the read
    /// may predate the mutation.
    pub async fn fetch_tagged(
        &self,
        key: &str,
        endpoint: &Endpoint,
        tags: &[String],
    ) -> QueryResult<Value> {
        if let Some(cached) = self.get(key) {
            if !cached.is_stale() {
                debug!(key, "Serving fresh cached read");
                return cached;
            }
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let state = match self.inner.queries.try_get_data::<Value>(endpoint).await {
            Ok(data) => {
                let is_stale = self.inner.generation.load(Ordering::Acquire) != generation;
                if is_stale {
                    debug!(key, "Invalidated while fetching; caching as stale");
                }
                let mut entry = CacheEntry::new(data.clone(), tags.to_vec());
                entry.is_stale = is_stale;
                self.inner.entries.insert(key.to_owned(), entry);
                QueryState::Success { data, is_stale }
            }
            Err(e) => {
                warn!(key, %endpoint, kind = %e.kind(), error = %e, "Cached read failed");
                QueryState::Error(e.to_string())
            }
        };

        QueryResult {
            key: key.to_owned(),
            state,
        }
    }

    /// Marks every entry covered by `event` as stale and returns how many were.
    ///
    /// Fetches in flight when this runs cache their result as stale.
    pub fn apply(&self, event: &InvalidationEvent) -> usize {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let mut marked = 0;
        for mut entry in self.inner.entries.iter_mut() {
            if event.scope.covers(&entry.tags) {
                entry.is_stale = true;
                marked += 1;
            }
        }
        debug!(marked, cause = ?event.cause, "Invalidation applied");
        marked
    }

    fn mark_stale(&self, key: &str) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.is_stale = true;
        }
    }

    fn downgrade(&self) -> WeakCache {
        WeakCache(Arc::downgrade(&self.inner))
    }

    fn closed(&self) -> watch::Receiver<()> {
        self.inner.closed.subscribe()
    }

    /// Spawns a task applying every event published on the bus.
    ///
    /// The subscription is taken before this returns, so no event published
    /// afterwards is missed. The task ends when the bus closes or the last
    /// clone of this cache is dropped; aborting the handle also stops it.
    pub fn listen(&self) -> JoinHandle<()> {
        let mut rx = self.inner.bus.subscribe();
        let mut closed = self.closed();
        let weak = self.downgrade();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = closed.changed() => break,
                    received = rx.recv() => received,
                };
                let Some(cache) = weak.upgrade() else { break };
                match received {
                    Ok(event) => {
                        cache.apply(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Invalidation listener lagged; invalidating everything");
                        cache.apply(&InvalidationEvent::all(None));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Invalidation listener stopped");
        })
    }

    /// Drops entries older than the configured cache time.
    pub fn evict_expired(&self) -> usize {
        let before = self.inner.entries.len();
        let cache_time = self.inner.config.cache_time;
        self.inner
            .entries
            .retain(|_, entry| !entry.should_gc(cache_time));
        before.saturating_sub(self.inner.entries.len())
    }

    /// A stream of states for `key` that refetches after each covering event.
    ///
    /// 1. Cached fresh data is emitted and the stream waits for invalidation.
    /// 2. Cached stale data is emitted, then refetched.
    /// 3. With nothing cached, `Loading` is emitted, then the fetch result.
    ///
    /// The stream ends when the bus closes or the last clone of this cache
    /// is dropped.
    pub fn watch(
        &self,
        key: impl Into<String>,
        endpoint: Endpoint,
        tags: Vec<String>,
    ) -> BoxStream<'static, QueryResult<Value>> {
        let key = key.into();
        let cache = self.downgrade();
        let channels = (self.inner.bus.subscribe(), self.closed());

        stream::unfold(
            (WatchState::Initial, channels),
            move |(state, (mut rx, mut closed))| {
                let key = key.clone();
                let endpoint = endpoint.clone();
                let tags = tags.clone();
                let cache = cache.clone();

                async move {
                    match state {
                        WatchState::Initial => {
                            let cached = cache.upgrade()?.get(&key);
                            let (result, next) = match cached {
                                Some(cached) if cached.is_stale() => (cached, WatchState::Fetching),
                                Some(cached) => (cached, WatchState::Watching),
                                None => (QueryResult::loading(key), WatchState::Fetching),
                            };
                            Some((result, (next, (rx, closed))))
                        }

                        WatchState::Fetching => {
                            let result = cache.upgrade()?.fetch_tagged(&key, &endpoint, &tags).await;
                            Some((result, (WatchState::Watching, (rx, closed))))
                        }

                        WatchState::Watching => loop {
                            let received = tokio::select! {
                                _ = closed.changed() => return None,
                                received = rx.recv() => received,
                            };
                            match received {
                                Ok(event) if !event.scope.covers(&tags) => continue,
                                Ok(_) | Err(RecvError::Lagged(_)) => {
                                    cache.upgrade()?.mark_stale(&key);
                                    let loading = QueryResult::loading(key);
                                    return Some((loading, (WatchState::Fetching, (rx, closed))));
                                }
                                Err(RecvError::Closed) => return None,
                            }
                        },
                    }
                }
            },
        )
        .boxed()
    }
}

#[derive(Clone)]
struct WeakCache(Weak<CacheInner>);

impl WeakCache {
    fn upgrade(&self) -> Option<QueryCache> {
        self.0.upgrade().map(|inner| QueryCache { inner })
    }
}

enum WatchState {
    Initial,
    Fetching,
    Watching,
}
