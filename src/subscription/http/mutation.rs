//! Mutations: one-off requests that change server state.
//!
//! Unlike queries, mutations are commands. A view keeps a
//! [`MutationTracker`] per control, asks it for a [`MutationTicket`] when the
//! user triggers the mutation, and hands the ticket to [`Mutation::mutate`].
//! The resulting [`MutationResult`] comes back through `update`, where the
//! tracker accepts it only if the ticket still belongs to the current
//! generation.
//!
//! ```text
//!         begin()            settle(Ok)
//!  Idle ──────────► Pending ───────────► Success
//!   ▲                  │    settle(Err)
//!   │                  └───────────────► Error
//!   └──────────── reset() from any state
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! Message::Delete => match self.delete.begin() {
//!     Some(ticket) => Mutation::mutate(
//!         ticket,
//!         post.id,
//!         move |id| Box::pin(async move { api.delete_post(id).await }),
//!         &self.client,
//!     )
//!     .map(Message::Deleted),
//!     None => Command::none(),
//! },
//! Message::Deleted(result) => {
//!     self.delete.settle(result.ticket, result.outcome);
//!     Command::none()
//! }
//! ```

use std::marker::PhantomData;

use futures::future::BoxFuture;

use crate::command::Command;

use super::client::QueryClient;
use super::error::QueryError;

/// The state of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<T> {
    /// Not started, or reset.
    Idle,
    /// Request in flight.
    Pending,
    /// The server accepted the mutation.
    Success(T),
    /// The mutation failed.
    Error(QueryError),
}

impl<T> MutationState<T> {
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Proof that a mutation was started by a particular tracker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationTicket {
    generation: u64,
}

/// Tracks the lifecycle of one mutation control.
#[derive(Debug, Clone)]
pub struct MutationTracker<T> {
    state: MutationState<T>,
    generation: u64,
}

impl<T> Default for MutationTracker<T> {
    fn default() -> Self {
        Self {
            state: MutationState::Idle,
            generation: 0,
        }
    }
}

impl<T> MutationTracker<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &MutationState<T> {
        &self.state
    }

    /// Moves to `Pending` and hands out a ticket for the request.
    ///
    /// Returns `None` while a request is already pending.
    pub fn begin(&mut self) -> Option<MutationTicket> {
        if self.state.is_pending() {
            return None;
        }
        self.state = MutationState::Pending;
        Some(MutationTicket {
            generation: self.generation,
        })
    }

    /// Records the outcome of the request started with `ticket`.
    ///
    /// Returns `false`, leaving the state untouched, if the tracker was reset
    /// since the ticket was issued or nothing is pending.
    pub fn settle(&mut self, ticket: MutationTicket, outcome: Result<T, QueryError>) -> bool {
        if ticket.generation != self.generation || !self.state.is_pending() {
            return false;
        }
        self.state = match outcome {
            Ok(data) => MutationState::Success(data),
            Err(error) => MutationState::Error(error),
        };
        true
    }

    /// Returns to `Idle`. Outstanding tickets become worthless.
    pub fn reset(&mut self) {
        self.state = MutationState::Idle;
        self.generation += 1;
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.state.is_success()
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.state.is_error()
    }
}

/// The settled outcome of a mutation, tagged with the ticket that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult<O> {
    pub ticket: MutationTicket,
    pub outcome: Result<O, QueryError>,
}

/// Runs mutations.
pub struct Mutation<I, O> {
    _phantom: PhantomData<(I, O)>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Executes `mutator(input)` and returns a command yielding its result.
    ///
    /// A failure is passed to the client's error handler before it is
    /// returned. The response is not written to the cache.
    pub fn mutate<F>(
        ticket: MutationTicket,
        input: I,
        mutator: F,
        client: &QueryClient,
    ) -> Command<MutationResult<O>>
    where
        F: FnOnce(I) -> BoxFuture<'static, Result<O, QueryError>> + Send + 'static,
    {
        let client = client.clone();

        Command::future(async move {
            let outcome = mutator(input).await;
            match &outcome {
                Ok(_) => tracing::info!("mutation succeeded"),
                Err(error) => {
                    tracing::warn!(%error, "mutation failed");
                    client.report_error(error);
                }
            }
            MutationResult { ticket, outcome }
        })
    }
}
