//! Transient error notifications.
//!
//! A [`Toaster`] is installed as the query cache's error handler. Each
//! failure replaces whatever toast is on screen, so a burst of failing
//! requests shows one toast instead of a stack of them.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;

use crate::subscription::http::{QueryConfig, QueryError};
use crate::subscription::{SubscriptionId, SubscriptionSource};

/// Title used when an error carries no usable message.
pub const FALLBACK_TITLE: &str = "error connecting to server";

/// How long a toast stays up unless dismissed.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);

/// A notification on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// `query-error-N`, unique per toast.
    pub id: String,
    pub title: String,
    pub raised_at: Instant,
}

/// The toast title for `error`.
#[must_use]
pub fn error_title(error: &QueryError) -> String {
    match error {
        QueryError::Unrecognized => FALLBACK_TITLE.to_owned(),
        error => error.to_string(),
    }
}

/// Shows at most one toast at a time.
///
/// Cloning yields a handle to the same toast slot.
#[derive(Debug, Clone)]
pub struct Toaster {
    tx: Arc<watch::Sender<Option<Toast>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Toaster {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Closes the current toast, if any, and shows a new one.
    pub fn show(&self, title: impl Into<String>) -> Toast {
        let id = format!("query-error-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let toast = Toast {
            id,
            title: title.into(),
            raised_at: Instant::now(),
        };

        tracing::debug!(id = %toast.id, title = %toast.title, "showing toast");
        if let Some(previous) = self.tx.send_replace(Some(toast.clone())) {
            tracing::trace!(id = %previous.id, "replaced toast");
        }
        toast
    }

    /// Closes every toast.
    pub fn close_all(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    /// Closes the current toast once it has been up for [`TOAST_LIFETIME`].
    ///
    /// Returns `true` if a toast was closed.
    pub fn expire(&self) -> bool {
        self.tx.send_if_modified(|current| {
            let expired = current
                .as_ref()
                .is_some_and(|toast| toast.raised_at.elapsed() >= TOAST_LIFETIME);
            if expired {
                *current = None;
            }
            expired
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<Toast> {
        self.tx.borrow().clone()
    }

    /// A query-cache error handler that raises a toast for every failure.
    ///
    /// ```
    /// use blogem::notify::Toaster;
    /// use blogem::subscription::http::QueryConfig;
    ///
    /// let toaster = Toaster::new();
    /// let config = toaster.error_handler(QueryConfig::default());
    /// ```
    #[must_use]
    pub fn error_handler(&self, config: QueryConfig) -> QueryConfig {
        let toaster = self.clone();
        config.on_error(move |error| {
            toaster.show(error_title(error));
        })
    }

    /// A subscription yielding the current toast now and after every change.
    #[must_use]
    pub fn source(&self) -> ToastFeed {
        ToastFeed {
            toaster: self.clone(),
        }
    }
}

/// Subscription returned by [`Toaster::source`].
pub struct ToastFeed {
    toaster: Toaster,
}

impl SubscriptionSource for ToastFeed {
    type Output = Option<Toast>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        WatchStream::new(self.toaster.tx.subscribe()).boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        "toasts".hash(&mut hasher);
        Arc::as_ptr(&self.toaster.tx).addr().hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}
