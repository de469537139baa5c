use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ConfigError, QueryError};

/// Callback invoked on every query and mutation failure.
pub type ErrorHandler = Arc<dyn Fn(&QueryError) + Send + Sync>;

/// Cache policy shared by every query and mutation of a [`QueryClient`](super::QueryClient).
#[derive(Clone)]
pub struct QueryConfig {
    /// How long data is considered fresh.
    ///
    /// Fresh data is served from the cache without a request. Individual
    /// queries and prefetches may override it.
    pub stale_time: Duration,

    /// How long an unobserved entry is kept before it is evicted.
    pub cache_time: Duration,

    /// Refetch stale data when a query subscription starts.
    pub refetch_on_mount: bool,

    /// Refetch observed stale data when the terminal regains focus.
    pub refetch_on_window_focus: bool,

    /// Refetch observed stale data after connectivity is restored.
    pub refetch_on_reconnect: bool,

    on_error: Option<ErrorHandler>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            cache_time: Duration::from_secs(5 * 60),
            refetch_on_mount: true,
            refetch_on_window_focus: true,
            refetch_on_reconnect: true,
            on_error: None,
        }
    }
}

impl QueryConfig {
    /// Creates a configuration with the given windows and default refetch triggers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CacheTimeBelowStaleTime`] if `cache_time < stale_time`.
    pub fn new(stale_time: Duration, cache_time: Duration) -> Result<Self, ConfigError> {
        if cache_time < stale_time {
            return Err(ConfigError::CacheTimeBelowStaleTime {
                stale_time,
                cache_time,
            });
        }

        Ok(Self {
            stale_time,
            cache_time,
            ..Self::default()
        })
    }

    /// Turns off every automatic refetch trigger.
    ///
    /// Data is then refetched only when a query key changes or an entry is
    /// invalidated explicitly.
    #[must_use]
    pub fn without_refetch(mut self) -> Self {
        self.refetch_on_mount = false;
        self.refetch_on_window_focus = false;
        self.refetch_on_reconnect = false;
        self
    }

    /// Installs the failure callback, replacing any previous one.
    #[must_use]
    pub fn on_error(mut self, handler: impl Fn(&QueryError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub(crate) fn report(&self, error: &QueryError) {
        if let Some(handler) = &self.on_error {
            handler(error);
        }
    }
}

impl fmt::Debug for QueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryConfig")
            .field("stale_time", &self.stale_time)
            .field("cache_time", &self.cache_time)
            .field("refetch_on_mount", &self.refetch_on_mount)
            .field("refetch_on_window_focus", &self.refetch_on_window_focus)
            .field("refetch_on_reconnect", &self.refetch_on_reconnect)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
