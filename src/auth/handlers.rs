use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::db::models::NewUser;
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
}

/// Present and not blank. The value itself is kept as sent.
pub(crate) fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(username), Some(email), Some(password)) = (
        required(req.username),
        required(req.email),
        required(req.password),
    ) else {
        return Err(AppError::Validation("All fields are required".into()));
    };

    if state.repo.email_exists(&email).await? {
        tracing::debug!("Registration rejected: email already in use");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash =
        password::hash_password(&password, state.config.auth.bcrypt_cost).await?;

    // The store's unique index catches a concurrent registration that slipped past the check.
    let user = state
        .repo
        .insert_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("User already exists".into()),
            other => other,
        })?;

    let token = state.tokens.issue(&user.id)?;
    tracing::info!(user_id = %user.id, "Registered user {}", user.username);

    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
    }))
}

/// POST /login
/// Unknown email and wrong password produce the same response.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
        return Err(AppError::Validation("Both fields are required".into()));
    };

    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(&password, &user.password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user.id)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some(String::new())), None);
        assert_eq!(required(Some("  \t".into())), None);
        assert_eq!(required(Some("ann".into())), Some("ann".into()));
        assert_eq!(required(Some(" ann ".into())), Some(" ann ".into()));
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(req.email.as_deref(), Some("a@b.c"));
        assert!(req.username.is_none());
        assert!(req.password.is_none());
    }
}
