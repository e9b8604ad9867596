use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::auth::token::TokenError;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller's user id.
/// Rejects with 401 before the handler runs if no valid bearer token is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts).ok_or_else(|| {
            tracing::debug!("Rejected request to {}: no token supplied", parts.uri.path());
            AppError::Unauthorized
        })?;

        match state.tokens.verify(token) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(TokenError::Expired) => {
                tracing::debug!("Rejected request to {}: token expired", parts.uri.path());
                Err(AppError::Unauthorized)
            }
            Err(e) => {
                tracing::debug!("Rejected request to {}: {}", parts.uri.path(), e);
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// JSON request body with every field optional.
///
/// A request without a JSON body (no body, or a non-JSON content type) yields
/// `T::default()`, so the handler reports its own missing-field message. A JSON
/// body that does not parse into `T` is a 400 with a `{message}` body instead of
/// axum's 415/422 plain-text rejections.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }

        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(AppError::Validation(rejection.body_text()))
            }
        }
    }
}

fn is_json_content_type(value: &str) -> bool {
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
