use serde::{Deserialize, Serialize};

/// A blog post. The author id sent by the API is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u32,
    pub title: String,
    pub body: String,
}

/// A comment on a post. The commenter's display name sent by the API is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    #[serde(rename = "postId")]
    pub post_id: u32,
    pub email: String,
    pub body: String,
}
