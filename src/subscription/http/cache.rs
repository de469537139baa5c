use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::error::QueryError;

pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// One slot of the query cache.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    data: Option<Erased>,
    updated_at: Option<Instant>,
    error: Option<QueryError>,
    invalidated: bool,
    observers: usize,
    idle_since: Option<Instant>,
}

impl CacheEntry {
    /// An empty, unobserved entry whose idle clock starts now.
    pub(crate) fn new() -> Self {
        Self {
            data: None,
            updated_at: None,
            error: None,
            invalidated: false,
            observers: 0,
            idle_since: Some(Instant::now()),
        }
    }

    /// Stores fresh data and clears any error or invalidation.
    pub(crate) fn set_data(&mut self, data: Erased) {
        self.data = Some(data);
        self.updated_at = Some(Instant::now());
        self.error = None;
        self.invalidated = false;
    }

    /// Records a failure. Previously fetched data is kept so a later
    /// invalidation can still show it while refetching.
    pub(crate) fn set_error(&mut self, error: QueryError) {
        self.error = Some(error);
    }

    pub(crate) fn data<V: Clone + 'static>(&self) -> Option<Result<V, ()>> {
        self.data
            .as_ref()
            .map(|data| data.downcast_ref::<V>().cloned().ok_or(()))
    }

    pub(crate) const fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Entries without data, invalidated entries, and entries older than
    /// `stale_time` are stale. A zero stale time makes every entry stale.
    pub(crate) fn is_stale(&self, stale_time: Duration) -> bool {
        if self.invalidated {
            return true;
        }
        self.updated_at
            .is_none_or(|updated_at| updated_at.elapsed() >= stale_time)
    }

    pub(crate) const fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub(crate) const fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub(crate) const fn observers(&self) -> usize {
        self.observers
    }

    pub(crate) const fn add_observer(&mut self) {
        self.observers += 1;
        self.idle_since = None;
    }

    pub(crate) fn remove_observer(&mut self) {
        self.observers = self.observers.saturating_sub(1);
        if self.observers == 0 {
            self.idle_since = Some(Instant::now());
        }
    }

    /// Unobserved entries idle for at least `cache_time` are eligible for eviction.
    pub(crate) fn should_gc(&self, cache_time: Duration) -> bool {
        self.observers == 0
            && self
                .idle_since
                .is_some_and(|idle_since| idle_since.elapsed() >= cache_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erased<T: Send + Sync + 'static>(value: T) -> Erased {
        Arc::new(value)
    }

    #[test]
    fn test_new_entry_is_stale_and_empty() {
        let entry = CacheEntry::new();
        assert!(entry.data::<i32>().is_none());
        assert!(entry.is_stale(Duration::from_secs(60)));
        assert_eq!(entry.observers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_follows_stale_time() {
        let mut entry = CacheEntry::new();
        entry.set_data(erased(42));
        assert!(!entry.is_stale(Duration::from_secs(5)));
        assert!(entry.is_stale(Duration::ZERO));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(entry.is_stale(Duration::from_secs(5)));
        assert!(!entry.is_stale(Duration::from_secs(6)));
    }

    #[test]
    fn test_invalidate_forces_stale_until_refreshed() {
        let mut entry = CacheEntry::new();
        entry.set_data(erased(1));
        entry.invalidate();
        assert!(entry.is_invalidated());
        assert!(entry.is_stale(Duration::from_secs(600)));

        entry.set_data(erased(2));
        assert!(!entry.is_invalidated());
        assert_eq!(entry.data::<i32>(), Some(Ok(2)));
    }

    #[test]
    fn test_downcast_to_wrong_type() {
        let mut entry = CacheEntry::new();
        entry.set_data(erased(1_i32));
        assert_eq!(entry.data::<String>(), Some(Err(())));
    }

    #[test]
    fn test_error_keeps_previous_data() {
        let mut entry = CacheEntry::new();
        entry.set_data(erased(1));
        entry.set_error(QueryError::Unrecognized);
        assert_eq!(entry.error(), Some(&QueryError::Unrecognized));
        assert_eq!(entry.data::<i32>(), Some(Ok(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_waits_for_idle_cache_time() {
        let cache_time = Duration::from_secs(10);
        let mut entry = CacheEntry::new();
        entry.add_observer();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!entry.should_gc(cache_time), "observed entries are never evicted");

        entry.remove_observer();
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!entry.should_gc(cache_time));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.should_gc(cache_time));
    }
}
