// Repository pattern - every store read and write goes through here
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use thiserror::Error;

use crate::db::models::{Author, NewUser, Post, PostView, User};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Credential and content store operations used by the request handlers.
#[async_trait]
pub trait SocialRepository: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError>;

    /// Insert a user with an empty `following` list.
    /// Returns `Conflict` if the email is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn insert_post(&self, author_id: &str, content: &str) -> Result<Post, RepositoryError>;

    async fn find_post(&self, id: &str) -> Result<Option<Post>, RepositoryError>;

    /// All posts in insertion order, authors resolved.
    async fn list_posts(&self) -> Result<Vec<PostView>, RepositoryError>;

    /// Add `user_id` to the post's likes if absent, as one conditional write.
    /// Returns false when it was already there.
    async fn add_like(&self, post_id: &str, user_id: &str) -> Result<bool, RepositoryError>;

    /// Add `followee_id` to the follower's `following` if absent.
    /// Returns false when it was already there.
    async fn add_following(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<bool, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteSocialRepository {
    pool: DbPool,
}

impl SqliteSocialRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs `f` with a pooled connection on the blocking thread pool, so a
    /// slow query or a busy wait on a locked database never parks an async worker.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn load_user(
    conn: &Connection,
    where_clause: &str,
    key: &str,
) -> Result<Option<User>, RepositoryError> {
    let sql = format!(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE {where_clause}"
    );
    let user = conn
        .query_row(&sql, params![key], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password_hash: row.get(3)?,
                following: Vec::new(),
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    match user {
        Some(mut user) => {
            user.following = load_following(conn, &user.id)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

fn load_following(conn: &Connection, user_id: &str) -> Result<Vec<String>, RepositoryError> {
    let mut stmt =
        conn.prepare("SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY rowid")?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

fn load_likes(conn: &Connection, post_id: &str) -> Result<Vec<String>, RepositoryError> {
    let mut stmt = conn.prepare("SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY rowid")?;
    let ids = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

#[async_trait]
impl SocialRepository for SqliteSocialRepository {
    async fn find_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let id = id.to_string();
        self.with_conn(move |conn| load_user(conn, "id = ?1", &id))
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.to_string();
        self.with_conn(move |conn| load_user(conn, "email = ?1", &email))
            .await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.with_conn(move |conn| {
            let id = new_id();

            let created_at: String = conn
                .query_row(
                    "INSERT INTO users (id, username, email, password_hash)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING created_at",
                    params![id, user.username, user.email, user.password_hash],
                    |row| row.get(0),
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        RepositoryError::Conflict(format!(
                            "email {} already registered",
                            user.email
                        ))
                    } else {
                        e.into()
                    }
                })?;

            Ok(User {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                following: Vec::new(),
                created_at,
            })
        })
        .await
    }

    async fn insert_post(&self, author_id: &str, content: &str) -> Result<Post, RepositoryError> {
        let author_id = author_id.to_string();
        let content = content.to_string();
        self.with_conn(move |conn| {
            let id = new_id();

            let created_at: String = conn.query_row(
                "INSERT INTO posts (id, user_id, content) VALUES (?1, ?2, ?3) RETURNING created_at",
                params![id, author_id, content],
                |row| row.get(0),
            )?;

            Ok(Post {
                id,
                content,
                author: author_id,
                likes: Vec::new(),
                created_at,
            })
        })
        .await
    }

    async fn find_post(&self, id: &str) -> Result<Option<Post>, RepositoryError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let post = conn
                .query_row(
                    "SELECT id, content, user_id, created_at FROM posts WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(Post {
                            id: row.get(0)?,
                            content: row.get(1)?,
                            author: row.get(2)?,
                            likes: Vec::new(),
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;

            match post {
                Some(mut post) => {
                    post.likes = load_likes(conn, &post.id)?;
                    Ok(Some(post))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_posts(&self) -> Result<Vec<PostView>, RepositoryError> {
        self.with_conn(|conn| {
            let mut likes: HashMap<String, Vec<String>> = HashMap::new();
            {
                let mut stmt =
                    conn.prepare("SELECT post_id, user_id FROM post_likes ORDER BY rowid")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                for row in rows {
                    let (post_id, user_id) = row?;
                    likes.entry(post_id).or_default().push(user_id);
                }
            }

            let mut stmt = conn.prepare(
                "SELECT p.id, p.content, p.created_at, u.id, u.username, u.email
                 FROM posts p
                 JOIN users u ON u.id = p.user_id
                 ORDER BY p.rowid",
            )?;
            let posts: Vec<PostView> = stmt
                .query_map([], |row| {
                    Ok(PostView {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        created_at: row.get(2)?,
                        author: Author {
                            id: row.get(3)?,
                            username: row.get(4)?,
                            email: row.get(5)?,
                        },
                        likes: Vec::new(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|mut post| {
                    post.likes = likes.remove(&post.id).unwrap_or_default();
                    post
                })
                .collect();

            Ok(posts)
        })
        .await
    }

    async fn add_like(&self, post_id: &str, user_id: &str) -> Result<bool, RepositoryError> {
        let post_id = post_id.to_string();
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                params![post_id, user_id],
            )?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn add_following(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<bool, RepositoryError> {
        let follower_id = follower_id.to_string();
        let followee_id = followee_id.to_string();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?1, ?2)",
                params![follower_id, followee_id],
            )?;
            Ok(inserted == 1)
        })
        .await
    }
}
