use crate::client::api::{ApiClient, ClientError};
use crate::db::models::{Post, PostView, User};

/// Client-side view state, owned by the caller and passed to whatever renders it.
///
/// Nothing here is optimistic: every field is replaced from a server response,
/// so `has_liked` and `is_following` always reflect the last thing the server said.
#[derive(Debug)]
pub struct Session {
    api: ApiClient,
    token: Option<String>,
    user_id: Option<String>,
    feed: Vec<PostView>,
    following: Vec<String>,
    pub draft: String,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            token: None,
            user_id: None,
            feed: Vec::new(),
            following: Vec::new(),
            draft: String::new(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn feed(&self) -> &[PostView] {
        &self.feed
    }

    pub fn following(&self) -> &[String] {
        &self.following
    }

    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        let auth = self.api.register(username, email, password).await?;
        self.sign_in(auth.token, auth.user_id);
        Ok(())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let auth = self.api.login(email, password).await?;
        self.sign_in(auth.token, auth.user_id);
        Ok(())
    }

    fn sign_in(&mut self, token: String, user_id: String) {
        if self.user_id.as_deref() != Some(user_id.as_str()) {
            // Follow state belongs to the previous account.
            self.following.clear();
        }
        self.token = Some(token);
        self.user_id = Some(user_id);
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.user_id = None;
        self.following.clear();
        self.draft.clear();
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::NotLoggedIn)
    }

    /// Replace the feed with the server's current list of posts.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.feed = self.api.list_posts().await?;
        Ok(())
    }

    /// Publish the draft, then reload the feed so the new post shows with its
    /// author resolved. The draft is kept if the server rejects it.
    pub async fn submit_draft(&mut self) -> Result<Post, ClientError> {
        let token = self.token()?;
        let post = self.api.create_post(token, &self.draft).await?;
        self.draft.clear();

        if let Err(e) = self.refresh().await {
            tracing::warn!("Post {} created but feed refresh failed: {}", post.id, e);
        }
        Ok(post)
    }

    pub async fn like(&mut self, post_id: &str) -> Result<Post, ClientError> {
        let token = self.token()?;
        let post = self.api.like_post(token, post_id).await?;
        self.apply_post(&post);
        Ok(post)
    }

    pub async fn follow(&mut self, user_id: &str) -> Result<User, ClientError> {
        let token = self.token()?;
        let user = self.api.follow_user(token, user_id).await?;
        self.apply_user(&user);
        Ok(user)
    }

    fn apply_post(&mut self, post: &Post) {
        if let Some(view) = self.feed.iter_mut().find(|p| p.id == post.id) {
            view.likes = post.likes.clone();
        }
    }

    fn apply_user(&mut self, user: &User) {
        if self.user_id.as_deref() == Some(user.id.as_str()) {
            self.following = user.following.clone();
        }
    }

    pub fn has_liked(&self, post_id: &str) -> bool {
        match self.user_id.as_deref() {
            Some(me) => self
                .feed
                .iter()
                .find(|p| p.id == post_id)
                .is_some_and(|p| p.liked_by(me)),
            None => false,
        }
    }

    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }
}
