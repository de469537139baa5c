//! Long-lived message sources.
//!
//! An application describes the sources it wants to hear from in
//! [`Application::subscriptions`](crate::application::Application::subscriptions).
//! After every update the runtime diffs that list by [`SubscriptionId`]:
//! sources that appeared are started, sources that disappeared are cancelled,
//! and unchanged sources keep running untouched.
//!
//! Re-keying a query (say, moving from `posts/1` to `posts/2`) therefore drops
//! the old stream and starts a new one, while the terminal event stream keeps
//! running across the change.

pub mod http;
pub mod terminal;
pub mod time;

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Action;

/// Identity of a running subscription.
///
/// Two sources with the same id are treated as the same subscription, so the
/// id must capture everything that changes what the stream yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    type_id: TypeId,
    hash: u64,
}

impl SubscriptionId {
    /// Builds an id from the source type and a hash of its parameters.
    #[must_use]
    pub fn of<T: 'static>(hash: u64) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            hash,
        }
    }
}

/// A producer of messages that lives as long as the application asks for it.
pub trait SubscriptionSource: Send + Sync + 'static {
    /// The item type yielded by the stream.
    type Output: Send + 'static;

    /// Opens the stream. Called once each time the subscription is started.
    fn stream(&self) -> BoxStream<'static, Self::Output>;

    /// Identity used for diffing.
    fn id(&self) -> SubscriptionId;
}

/// A type-erased subscription, already mapped into the application's message type.
pub struct Subscription<Msg> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: Arc<dyn Fn() -> BoxStream<'static, Msg> + Send + Sync>,
}

impl<Msg: Send + 'static> Subscription<Msg> {
    /// Wraps a source.
    pub fn new<S>(source: S) -> Self
    where
        S: SubscriptionSource<Output = Msg>,
    {
        let id = source.id();
        Self {
            id,
            spawn: Arc::new(move || source.stream()),
        }
    }

    /// Converts the items of this subscription into another message type.
    #[must_use]
    pub fn map<B, F>(self, f: F) -> Subscription<B>
    where
        B: Send + 'static,
        F: Fn(Msg) -> B + Send + Sync + 'static,
    {
        let spawn = self.spawn;
        let f = Arc::new(f);
        Subscription {
            id: self.id,
            spawn: Arc::new(move || {
                let f = f.clone();
                spawn().map(move |msg| f(msg)).boxed()
            }),
        }
    }

    /// The identity of the underlying source.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Handle for a running subscription task.
struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Handle {
    async fn cancel(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

/// Starts and stops subscription tasks as the application's list changes.
pub(crate) struct SubscriptionManager<Msg> {
    running: HashMap<SubscriptionId, Handle>,
    tx: mpsc::UnboundedSender<Action<Msg>>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Action<Msg>>) -> Self {
        Self {
            running: HashMap::new(),
            tx,
        }
    }

    pub(crate) fn update(&mut self, subscriptions: Vec<Subscription<Msg>>) {
        let wanted: HashSet<SubscriptionId> = subscriptions.iter().map(|sub| sub.id).collect();

        self.running.retain(|id, handle| {
            let keep = wanted.contains(id);
            if !keep {
                tracing::trace!(?id, "cancelling subscription");
                handle.token.cancel();
            }
            keep
        });

        for sub in subscriptions {
            if self.running.contains_key(&sub.id) {
                continue;
            }

            let token = CancellationToken::new();
            let cancelled = token.clone();
            let tx = self.tx.clone();
            let mut stream = (sub.spawn)();

            let join = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = cancelled.cancelled() => break,
                        next = stream.next() => match next {
                            Some(msg) => {
                                if tx.send(Action::Message(msg)).is_err() {
                                    break;
                                }
                            }
                            None => break,
                        },
                    }
                }
            });

            tracing::trace!(id = ?sub.id, "started subscription");
            self.running.insert(sub.id, Handle { token, join });
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.running.len()
    }

    pub(crate) async fn shutdown(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.cancel().await;
        }
    }
}
