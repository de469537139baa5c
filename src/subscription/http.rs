//! Cached HTTP queries and mutations.
//!
//! Reads go through [`Query`] subscriptions backed by a shared
//! [`QueryClient`]. Writes are [`Mutation`] commands whose lifecycle is kept
//! by a [`MutationTracker`].
//!
//! # Features
//!
//! - **Queries**: subscription-based loading with stale-while-revalidate caching
//! - **De-duplication**: one request per key, shared by every caller
//! - **Prefetching**: warm the cache for data the user is likely to ask for next
//! - **Invalidation**: prefix-based, refetching every active query under the prefix
//! - **Garbage collection**: unobserved entries are evicted after `cache_time`
//! - **Mutations**: command-based writes with generation-checked results
//!
//! # Example
//!
//! ```rust,ignore
//! impl Application for App {
//!     fn subscriptions(&self) -> Vec<Subscription<Message>> {
//!         let api = self.api.clone();
//!         let id = self.post_id;
//!         vec![
//!             Subscription::new(Query::new(
//!                 QueryKey::new("comments").with(id),
//!                 move || {
//!                     let api = api.clone();
//!                     Box::pin(async move { api.fetch_comments(id).await })
//!                 },
//!                 self.client.clone(),
//!             ))
//!             .map(Message::Comments),
//!         ]
//!     }
//!
//!     fn update(&mut self, msg: Message) -> Command<Message> {
//!         match msg {
//!             Message::Comments(result) => {
//!                 self.comments = result.state;
//!                 Command::none()
//!             }
//!             Message::Refresh => self.client.invalidate(&QueryKey::new("comments")),
//!         }
//!     }
//! }
//! ```

mod cache;
mod client;
mod config;
mod error;
mod key;
pub mod mutation;
pub mod query;

pub use client::QueryClient;
pub use config::{ErrorHandler, QueryConfig};
pub use error::{ConfigError, QueryError};
pub use key::{KeyPart, QueryKey};
pub use mutation::{Mutation, MutationResult, MutationState, MutationTicket, MutationTracker};
pub use query::{Query, QueryResult, QueryState};
