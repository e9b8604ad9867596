use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::AuthUser;
use crate::routes::require_account;
use crate::state::AppState;

/// POST /users/{id}/follow
/// Responds with the caller's updated account.
async fn follow_user(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(target_id): Path<String>,
) -> AppResult<Json<User>> {
    if state.repo.find_user(&target_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    require_account(&state, &user_id).await?;

    if !state.repo.add_following(&user_id, &target_id).await? {
        return Err(AppError::Conflict("You already follow this user".into()));
    }

    let user = state
        .repo
        .find_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    tracing::info!(user_id = %user_id, target = %target_id, "Followed user");

    Ok(Json(user))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{id}/follow", post(follow_user))
}
