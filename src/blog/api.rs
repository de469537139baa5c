use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::subscription::http::QueryError;

use super::model::{Comment, Post};

/// Public JSONPlaceholder instance.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Posts per page of the list view.
pub const POSTS_PER_PAGE: u32 = 10;

/// Title sent by the update mutation.
pub const UPDATED_TITLE: &str = "REACT QUERY FOREVER!!!!";

/// Client for a JSONPlaceholder-compatible blog API.
#[derive(Debug, Clone)]
pub struct BlogApi {
    http: reqwest::Client,
    base_url: String,
}

impl Default for BlogApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BlogApi {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// `GET /posts?_limit=10&_page={page}`
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success statuses and undecodable bodies.
    pub async fn fetch_posts(&self, page: u32) -> Result<Vec<Post>, QueryError> {
        let request = self
            .http
            .get(self.url("posts"))
            .query(&[("_limit", POSTS_PER_PAGE), ("_page", page)]);
        decode(send(request).await?).await
    }

    /// `GET /comments?postId={post_id}`
    ///
    /// Only comments of `post_id` are returned; anything else the server
    /// sends back is dropped with a warning.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success statuses and undecodable bodies.
    pub async fn fetch_comments(&self, post_id: u32) -> Result<Vec<Comment>, QueryError> {
        let request = self
            .http
            .get(self.url("comments"))
            .query(&[("postId", post_id)]);
        let comments: Vec<Comment> = decode(send(request).await?).await?;

        let (own, foreign): (Vec<_>, Vec<_>) = comments
            .into_iter()
            .partition(|comment| comment.post_id == post_id);
        if !foreign.is_empty() {
            tracing::warn!(post_id, dropped = foreign.len(), "server returned comments of other posts");
        }
        Ok(own)
    }

    /// `PATCH /posts/{post_id}` with a new title.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success statuses and undecodable bodies.
    pub async fn update_post(&self, post_id: u32) -> Result<Post, QueryError> {
        let request = self
            .http
            .patch(self.url(&format!("posts/{post_id}")))
            .json(&json!({ "title": UPDATED_TITLE }));
        decode(send(request).await?).await
    }

    /// `DELETE /posts/{post_id}`. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Fails on transport errors and non-success statuses.
    pub async fn delete_post(&self, post_id: u32) -> Result<(), QueryError> {
        let request = self.http.delete(self.url(&format!("posts/{post_id}")));
        send(request).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder) -> Result<Response, QueryError> {
    let response = request
        .send()
        .await
        .map_err(|e| QueryError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(url = %response.url(), %status, "unexpected status");
        return Err(QueryError::UnexpectedStatus(status.as_u16()));
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, QueryError> {
    response
        .json()
        .await
        .map_err(|e| QueryError::FetchError(e.to_string()))
}
