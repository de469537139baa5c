//! Periodic ticks.
//!
//! The blog shell uses a one-second [`Timer`] to sweep the query cache and to
//! expire notifications.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::wrappers::IntervalStream;

use super::{SubscriptionId, SubscriptionSource};

/// Emitted by [`Timer`] once per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Emits a [`Tick`] every `interval_ms` milliseconds.
///
/// The first tick arrives one full interval after the subscription starts.
/// Missed ticks are skipped rather than replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    interval_ms: u64,
}

impl Timer {
    #[must_use]
    pub const fn new(interval_ms: u64) -> Self {
        Self { interval_ms }
    }
}

impl SubscriptionSource for Timer {
    type Output = Tick;

    fn stream(&self) -> BoxStream<'static, Tick> {
        let mut ticks = interval(Duration::from_millis(self.interval_ms));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        IntervalStream::new(ticks).skip(1).map(|_| Tick).boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn test_id_depends_on_interval() {
        assert_eq!(Timer::new(1000).id(), Timer::new(1000).id());
        assert_ne!(Timer::new(1000).id(), Timer::new(500).id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_immediate_tick() {
        let mut stream = Timer::new(1000).stream();

        let early = timeout(Duration::from_millis(900), stream.next()).await;
        assert!(early.is_err(), "first tick must wait a full interval");

        let tick = timeout(Duration::from_millis(200), stream.next()).await;
        assert!(matches!(tick, Ok(Some(Tick))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_repeat() {
        let mut stream = Timer::new(50).stream();
        for _ in 0..3 {
            let tick = timeout(Duration::from_millis(60), stream.next()).await;
            assert!(matches!(tick, Ok(Some(Tick))));
        }
    }
}
