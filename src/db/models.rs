use serde::{Deserialize, Serialize};

/// A registered account. `following` is in the order the follows were made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub following: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A post as stored: `author` is the author's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: String,
    pub likes: Vec<String>,
    pub created_at: String,
}

/// Public part of a user shown next to a post in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// A feed entry with the author resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub content: String,
    pub author: Author,
    pub likes: Vec<String>,
    pub created_at: String,
}

impl PostView {
    pub fn liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }
}
