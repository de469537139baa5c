//! # blogem
//!
//! A terminal blog reader built on a small Elm-architecture runtime over
//! [ratatui](https://ratatui.rs/), with a key-based query cache in the style
//! of TanStack Query.
//!
//! ## Architecture
//!
//! 1. **Model**: the application state
//! 2. **Message**: events that can change the state
//! 3. **Update**: applies a message and returns a command
//! 4. **View**: renders the state
//! 5. **Subscriptions**: long-lived sources (terminal, timers, queries)
//! 6. **Commands**: one-off side effects (prefetches, mutations, invalidations)
//!
//! ## Core Components
//!
//! - [`Application`](application::Application): the trait an app implements
//! - [`Runtime`](runtime::Runtime): the event loop
//! - [`Command`](command::Command): deferred side effects
//! - [`Subscription`](subscription::Subscription): message sources
//! - [`QueryClient`](subscription::http::QueryClient): the shared query cache
//!
//! The reader itself lives in [`blog`]; [`notify`] raises error toasts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use blogem::{blog::BlogApp, config::Args, runtime::Runtime};
//! use clap::Parser;
//!
//! # async fn run() -> color_eyre::Result<()> {
//! let args = Args::parse();
//! let mut terminal = ratatui::init();
//! let result = Runtime::<BlogApp>::new(args.flags()?)
//!     .run(&mut terminal, args.frame_rate)
//!     .await;
//! ratatui::restore();
//! result
//! # }
//! ```

pub mod application;
pub mod blog;
pub mod command;
pub mod config;
pub mod logging;
pub mod notify;
pub mod runtime;
pub mod subscription;
