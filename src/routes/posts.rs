use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::{Post, PostView};
use crate::error::{AppError, AppResult};
use crate::extractors::{AuthUser, JsonBody};
use crate::routes::require_account;
use crate::state::AppState;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatePostRequest {
    pub content: Option<String>,
}

/// POST /posts
async fn create_post(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> AppResult<Json<Post>> {
    let content = req
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Post content is required".into()))?;
    require_account(&state, &user_id).await?;

    let post = state.repo.insert_post(&user_id, &content).await?;
    tracing::info!(post_id = %post.id, author = %user_id, "Created post");

    Ok(Json(post))
}

/// GET /posts
async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<PostView>>> {
    let posts = state.repo.list_posts().await?;
    Ok(Json(posts))
}

/// POST /posts/{id}/like
async fn like_post(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Post>> {
    if state.repo.find_post(&post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".into()));
    }
    require_account(&state, &user_id).await?;

    if !state.repo.add_like(&post_id, &user_id).await? {
        return Err(AppError::Conflict("You already liked this post".into()));
    }

    let post = state
        .repo
        .find_post(&post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;
    tracing::info!(post_id = %post_id, user_id = %user_id, "Liked post");

    Ok(Json(post))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}/like", post(like_post))
}
