//! The blog reader: a paginated post list with a detail pane.

pub mod api;
pub mod app;
pub mod model;
pub mod post_detail;
pub mod posts;

use std::sync::Arc;

use crate::subscription::http::{QueryClient, QueryKey};

pub use api::BlogApi;
pub use app::{AppFlags, BlogApp};
pub use model::{Comment, Post};

/// Handles shared by every view.
#[derive(Debug, Clone)]
pub struct BlogContext {
    pub client: Arc<QueryClient>,
    pub api: Arc<BlogApi>,
}

impl BlogContext {
    #[must_use]
    pub fn new(client: QueryClient, api: BlogApi) -> Self {
        Self {
            client: Arc::new(client),
            api: Arc::new(api),
        }
    }
}

/// `posts/{page}`
#[must_use]
pub fn posts_key(page: u32) -> QueryKey {
    QueryKey::new("posts").with(page)
}

/// `comments/{post_id}`
#[must_use]
pub fn comments_key(post_id: u32) -> QueryKey {
    QueryKey::new("comments").with(post_id)
}
