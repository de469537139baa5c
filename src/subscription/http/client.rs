use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::broadcast;

use crate::command::Command;

use super::cache::{CacheEntry, Erased};
use super::config::QueryConfig;
use super::error::QueryError;
use super::key::QueryKey;

type SharedFetch = Shared<BoxFuture<'static, Result<Erased, QueryError>>>;

/// What the cache holds for a key, classified against a stale time.
pub(crate) enum Lookup<V> {
    Fresh(V),
    Stale(V),
    Invalidated(V),
    Missing,
}

/// Owner of the query cache.
///
/// One client is created at startup and handed to every view through an
/// `Arc`. It is responsible for:
///
/// - storing the last result of every key,
/// - making sure at most one request per key is in flight,
/// - broadcasting invalidations to active [`Query`](super::Query) subscriptions,
/// - evicting unobserved entries once they outlive `cache_time`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use blogem::subscription::http::{QueryClient, QueryConfig};
///
/// let config = QueryConfig::new(Duration::from_secs(600), Duration::from_secs(900))
///     .expect("cache time is not shorter than stale time")
///     .without_refetch();
/// let client = QueryClient::with_config(config);
/// assert!(client.is_empty());
/// ```
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<DashMap<QueryKey, CacheEntry>>,
    in_flight: Arc<DashMap<QueryKey, SharedFetch>>,
    invalidation_tx: broadcast::Sender<QueryKey>,
    config: QueryConfig,
}

impl QueryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (invalidation_tx, _) = broadcast::channel(100);
        Self {
            cache: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            invalidation_tx,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns the cached data for `key`, if any was stored with type `V`.
    #[must_use]
    pub fn get_query_data<V: Clone + 'static>(&self, key: &QueryKey) -> Option<V> {
        self.cache.get(key)?.data::<V>()?.ok()
    }

    /// Stores `data` under `key` as if it had just been fetched.
    pub fn set_query_data<V: Send + Sync + 'static>(&self, key: QueryKey, data: V) {
        self.cache
            .entry(key)
            .or_insert_with(CacheEntry::new)
            .set_data(Arc::new(data));
    }

    /// Returns `true` if `key` has no data, was invalidated, or is older than `stale_time`.
    #[must_use]
    pub fn is_stale(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.cache
            .get(key)
            .is_none_or(|entry| entry.is_stale(stale_time))
    }

    /// Number of live [`Query`](super::Query) subscriptions on `key`.
    #[must_use]
    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.cache.get(key).map_or(0, |entry| entry.observers())
    }

    /// Resolves `key`, serving fresh cached data without calling `fetcher`.
    ///
    /// Stale or missing data is fetched, joining a request already in flight
    /// for the same key if there is one. Failures are returned but not
    /// reported to the error handler.
    pub fn fetch_query<V, F>(
        &self,
        key: QueryKey,
        fetcher: F,
        stale_time: Duration,
    ) -> BoxFuture<'static, Result<V, QueryError>>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> BoxFuture<'static, Result<V, QueryError>> + Send + 'static,
    {
        if let Ok(Lookup::Fresh(data)) = self.lookup::<V>(&key, stale_time) {
            tracing::debug!(%key, "serving fresh data from cache");
            return futures::future::ready(Ok(data)).boxed();
        }

        self.fetch(key, fetcher)
    }

    /// Warms the cache for `key` in the background.
    ///
    /// The returned command produces no message. Fresh data is left alone,
    /// and a failed prefetch is only logged.
    pub fn prefetch_query<V, F, Msg>(
        &self,
        key: QueryKey,
        fetcher: F,
        stale_time: Duration,
    ) -> Command<Msg>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> BoxFuture<'static, Result<V, QueryError>> + Send + 'static,
        Msg: Send + 'static,
    {
        let request = self.fetch_query(key.clone(), fetcher, stale_time);

        Command::task(async move {
            match request.await {
                Ok(_) => tracing::debug!(%key, "prefetched"),
                Err(error) => tracing::debug!(%key, %error, "prefetch failed"),
            }
        })
    }

    /// Marks every entry under `prefix` as invalidated and tells active
    /// queries to refetch.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// Message::Refresh => self.client.invalidate(&QueryKey::new("posts")),
    /// ```
    pub fn invalidate<Msg: Send + 'static>(&self, prefix: &QueryKey) -> Command<Msg> {
        let client = self.clone();
        let prefix = prefix.clone();

        Command::task(async move {
            client.invalidate_now(&prefix);
        })
    }

    /// Terminal focus came back. Refetches observed stale entries when
    /// `refetch_on_window_focus` is on.
    pub fn window_focused<Msg: Send + 'static>(&self) -> Command<Msg> {
        if self.config.refetch_on_window_focus {
            self.refetch_observed_stale()
        } else {
            Command::none()
        }
    }

    /// Connectivity came back. Refetches observed stale entries when
    /// `refetch_on_reconnect` is on.
    pub fn reconnected<Msg: Send + 'static>(&self) -> Command<Msg> {
        if self.config.refetch_on_reconnect {
            self.refetch_observed_stale()
        } else {
            Command::none()
        }
    }

    /// Evicts unobserved entries idle for at least `cache_time`.
    ///
    /// Returns the number of evicted entries. Entries with a request in
    /// flight are kept.
    pub fn garbage_collect(&self) -> usize {
        let cache_time = self.config.cache_time;
        let mut evicted = 0;

        self.cache.retain(|key, entry| {
            let keep = !entry.should_gc(cache_time) || self.in_flight.contains_key(key);
            if !keep {
                tracing::debug!(%key, "evicting idle query");
                evicted += 1;
            }
            keep
        });

        evicted
    }

    pub(crate) fn lookup<V: Clone + 'static>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
    ) -> Result<Lookup<V>, QueryError> {
        let Some(entry) = self.cache.get(key) else {
            return Ok(Lookup::Missing);
        };

        match entry.data::<V>() {
            None => Ok(Lookup::Missing),
            Some(Err(())) => Err(QueryError::TypeMismatch(key.to_string())),
            Some(Ok(data)) if entry.is_invalidated() => Ok(Lookup::Invalidated(data)),
            Some(Ok(data)) if entry.is_stale(stale_time) => Ok(Lookup::Stale(data)),
            Some(Ok(data)) => Ok(Lookup::Fresh(data)),
        }
    }

    /// Runs `fetcher` for `key` unless a request is already in flight, in
    /// which case that request is awaited instead.
    pub(crate) fn fetch<V, F>(&self, key: QueryKey, fetcher: F) -> BoxFuture<'static, Result<V, QueryError>>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> BoxFuture<'static, Result<V, QueryError>> + Send + 'static,
    {
        let request = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(running) => {
                tracing::debug!(%key, "joining in-flight request");
                running.get().clone()
            }
            Entry::Vacant(slot) => {
                tracing::debug!(%key, "fetching");
                let client = self.clone();
                let settle_key = key.clone();
                let request = async move {
                    let result = fetcher().await.map(|data| Arc::new(data) as Erased);
                    client.settle(settle_key, &result);
                    result
                }
                .boxed()
                .shared();
                slot.insert(request.clone());
                // Runs to completion even after every awaiter is dropped.
                // Outside a runtime the first awaiter drives it.
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(request.clone());
                }
                request
            }
        };

        async move {
            let data = request.await?;
            data.downcast_ref::<V>()
                .cloned()
                .ok_or_else(|| QueryError::TypeMismatch(key.to_string()))
        }
        .boxed()
    }

    fn settle(&self, key: QueryKey, result: &Result<Erased, QueryError>) {
        {
            let mut entry = self.cache.entry(key.clone()).or_insert_with(CacheEntry::new);
            match result {
                Ok(data) => entry.set_data(data.clone()),
                Err(error) => entry.set_error(error.clone()),
            }
        }
        self.in_flight.remove(&key);

        match result {
            Ok(_) => tracing::debug!(%key, "fetch succeeded"),
            Err(error) => tracing::warn!(%key, %error, "fetch failed"),
        }
    }

    /// Like [`invalidate`](Self::invalidate), applied immediately.
    ///
    /// Returns the number of cache entries that matched `prefix`.
    pub fn invalidate_now(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        for mut entry in self.cache.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.invalidate();
                count += 1;
            }
        }

        tracing::info!(%prefix, entries = count, "invalidated queries");
        // No receivers simply means no query is active right now.
        let _ = self.invalidation_tx.send(prefix.clone());
        count
    }

    fn refetch_observed_stale<Msg: Send + 'static>(&self) -> Command<Msg> {
        let client = self.clone();

        Command::task(async move {
            let stale_time = client.config.stale_time;
            let keys: Vec<QueryKey> = client
                .cache
                .iter()
                .filter(|entry| entry.observers() > 0 && entry.is_stale(stale_time))
                .map(|entry| entry.key().clone())
                .collect();

            for key in keys {
                client.invalidate_now(&key);
            }
        })
    }

    pub(crate) fn subscribe_invalidation(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidation_tx.subscribe()
    }

    pub(crate) fn report_error(&self, error: &QueryError) {
        self.config.report(error);
    }

    /// Registers a live subscription on `key` until the guard is dropped.
    pub(crate) fn observe(&self, key: QueryKey) -> ObserverGuard {
        self.cache
            .entry(key.clone())
            .or_insert_with(CacheEntry::new)
            .add_observer();

        ObserverGuard {
            client: self.clone(),
            key,
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Keeps an entry observed, protecting it from eviction.
pub(crate) struct ObserverGuard {
    client: QueryClient,
    key: QueryKey,
}

impl ObserverGuard {
    pub(crate) const fn client(&self) -> &QueryClient {
        &self.client
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Some(mut entry) = self.client.cache.get_mut(&self.key) {
            entry.remove_observer();
        }
    }
}
