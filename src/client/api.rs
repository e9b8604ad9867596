use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::auth::handlers::AuthResponse;
use crate::db::models::{Post, PostView, User};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },

    #[error("Not logged in")]
    NotLoggedIn,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            ClientError::NotLoggedIn => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Typed wrapper over the HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        Err(ClientError::Api { status, message })
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let body = json!({ "username": username, "email": email, "password": password });
        Self::send(self.http.post(self.url("/register")).json(&body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "email": email, "password": password });
        Self::send(self.http.post(self.url("/login")).json(&body)).await
    }

    pub async fn create_post(&self, token: &str, content: &str) -> Result<Post, ClientError> {
        let request = self
            .http
            .post(self.url("/posts"))
            .bearer_auth(token)
            .json(&json!({ "content": content }));
        Self::send(request).await
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>, ClientError> {
        Self::send(self.http.get(self.url("/posts"))).await
    }

    pub async fn like_post(&self, token: &str, post_id: &str) -> Result<Post, ClientError> {
        let request = self
            .http
            .post(self.url(&format!("/posts/{post_id}/like")))
            .bearer_auth(token);
        Self::send(request).await
    }

    pub async fn follow_user(&self, token: &str, user_id: &str) -> Result<User, ClientError> {
        let request = self
            .http
            .post(self.url(&format!("/users/{user_id}/follow")))
            .bearer_auth(token);
        Self::send(request).await
    }
}
