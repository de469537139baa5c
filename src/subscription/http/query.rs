//! Cached queries as subscriptions.
//!
//! A [`Query`] is a subscription keyed by a [`QueryKey`]. While the
//! application lists it in `subscriptions()`, it:
//!
//! 1. emits cached data right away when there is any,
//! 2. fetches when the cache is empty, stale or invalidated. Stale data on a
//!    view's first query is only refetched when `refetch_on_mount` is on;
//!    a query marked with [`Query::on_key_change`] always refetches it,
//! 3. refetches whenever an invalidation matching its key is broadcast.
//!
//! Changing the key in `subscriptions()` drops the old query and starts a new
//! one. A request the old query had in flight still completes and fills the
//! cache, but nothing is emitted for it.
//!
//! # Example
//!
//! ```rust,ignore
//! fn subscriptions(&self) -> Vec<Subscription<Message>> {
//!     let api = self.api.clone();
//!     let page = self.page;
//!     vec![
//!         Subscription::new(Query::new(
//!             QueryKey::new("posts").with(page),
//!             move || {
//!                 let api = api.clone();
//!                 Box::pin(async move { api.fetch_posts(page).await })
//!             },
//!             self.client.clone(),
//!         ))
//!         .map(Message::Posts),
//!     ]
//! }
//! ```

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::subscription::{SubscriptionId, SubscriptionSource};

use super::client::{Lookup, QueryClient};
use super::error::QueryError;
use super::key::QueryKey;

/// The state of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<T> {
    /// No data yet; a request is in flight.
    Loading,
    /// Data is available.
    Success {
        data: T,
        /// `true` when the data is older than the stale time or was
        /// invalidated. A refetch may be running.
        is_stale: bool,
    },
    /// The last request failed.
    Error(QueryError),
}

impl<T> QueryState<T> {
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Success { is_stale: true, .. })
    }

    /// Keeps showing `previous` data while a new key loads.
    ///
    /// `Loading` is replaced by `previous` when `previous` holds data. Every
    /// other state, including errors, wins over the previous one.
    #[must_use]
    pub fn or_previous(self, previous: Self) -> Self {
        match (self, previous) {
            (Self::Loading, previous @ Self::Success { .. }) => previous,
            (next, _) => next,
        }
    }
}

/// One emission of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult<T> {
    /// The key this result belongs to. Views compare it to the key they are
    /// currently showing and drop results for keys they moved away from.
    pub key: QueryKey,
    pub state: QueryState<T>,
}

type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync>;

/// A subscription that keeps one cache key loaded.
pub struct Query<V> {
    key: QueryKey,
    fetcher: Fetcher<V>,
    client: Arc<QueryClient>,
    stale_time: Option<Duration>,
    key_change: bool,
}

impl<V> Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a query for `key` that loads data with `fetcher`.
    pub fn new<F>(key: QueryKey, fetcher: F, client: Arc<QueryClient>) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<V, QueryError>> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(fetcher),
            client,
            stale_time: None,
            key_change: false,
        }
    }

    /// Overrides the client's stale time for this query.
    #[must_use]
    pub const fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Marks this query as replacing another key of the same view, such as
    /// the next page of a list.
    ///
    /// Only a view's first query counts as a mount. Stale data found after a
    /// key change is refetched whatever `refetch_on_mount` says.
    #[must_use]
    pub const fn on_key_change(mut self) -> Self {
        self.key_change = true;
        self
    }

    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl<V> SubscriptionSource for Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = QueryResult<V>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        let key = self.key.clone();
        let fetcher = self.fetcher.clone();
        let stale_time = self.stale_time.unwrap_or(self.client.config().stale_time);
        let refetch_stale = self.key_change || self.client.config().refetch_on_mount;
        let observer = self.client.observe(key.clone());
        let rx = self.client.subscribe_invalidation();

        stream::unfold(
            Cursor {
                phase: Phase::Initial,
                rx,
            },
            move |Cursor { phase, mut rx }| {
                let client = observer.client().clone();
                let key = key.clone();
                let fetcher = fetcher.clone();

                async move {
                    let emit = |state| QueryResult {
                        key: key.clone(),
                        state,
                    };

                    match phase {
                        Phase::Initial => {
                            let (state, next) = match client.lookup::<V>(&key, stale_time) {
                                Ok(Lookup::Fresh(data)) => (success(data, false), Phase::Watching),
                                Ok(Lookup::Stale(data)) if !refetch_stale => {
                                    (success(data, true), Phase::Watching)
                                }
                                Ok(Lookup::Stale(data) | Lookup::Invalidated(data)) => {
                                    (success(data, true), Phase::Fetching)
                                }
                                Ok(Lookup::Missing) => (QueryState::Loading, Phase::Fetching),
                                Err(error) => (QueryState::Error(error), Phase::Watching),
                            };
                            Some((emit(state), Cursor { phase: next, rx }))
                        }

                        Phase::Fetching => {
                            let state = match client.fetch(key.clone(), move || fetcher()).await {
                                Ok(data) => success(data, false),
                                Err(error) => {
                                    client.report_error(&error);
                                    QueryState::Error(error)
                                }
                            };
                            Some((
                                emit(state),
                                Cursor {
                                    phase: Phase::Watching,
                                    rx,
                                },
                            ))
                        }

                        Phase::Watching => loop {
                            match rx.recv().await {
                                Ok(prefix) if key.starts_with(&prefix) => {
                                    tracing::debug!(%key, "refetching after invalidation");
                                    let state = client
                                        .get_query_data::<V>(&key)
                                        .map_or(QueryState::Loading, |data| success(data, true));
                                    return Some((
                                        emit(state),
                                        Cursor {
                                            phase: Phase::Fetching,
                                            rx,
                                        },
                                    ));
                                }
                                Ok(_) | Err(RecvError::Lagged(_)) => {}
                                Err(RecvError::Closed) => return None,
                            }
                        },
                    }
                }
            },
        )
        .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

impl<V> Hash for Query<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

const fn success<T>(data: T, is_stale: bool) -> QueryState<T> {
    QueryState::Success { data, is_stale }
}

struct Cursor {
    phase: Phase,
    rx: broadcast::Receiver<QueryKey>,
}

enum Phase {
    Initial,
    Fetching,
    Watching,
}
