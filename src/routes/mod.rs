pub mod auth;
pub mod posts;
pub mod users;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Full HTTP surface with request tracing and CORS for the configured origin.
pub fn app(state: AppState) -> anyhow::Result<Router> {
    let origin: HeaderValue = state.config.cors_origin()?.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let app = Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(users::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

/// The account behind a verified token. A token can outlive its account, and
/// every mutating route answers that case with the same 404.
pub(crate) async fn require_account(state: &AppState, user_id: &str) -> AppResult<User> {
    state.repo.find_user(user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user_id, "Token subject no longer exists");
        AppError::NotFound("User not found".into())
    })
}
