//! End-to-end: a real listener on an ephemeral port, driven through the client session.

use std::sync::Arc;

use reqwest::StatusCode;
use tempfile::TempDir;

use murmur::auth::token::TokenService;
use murmur::client::{ApiClient, ClientError, Session};
use murmur::config::Config;
use murmur::db::{self, repository::SqliteSocialRepository};
use murmur::routes;
use murmur::state::AppState;

/// Serves the app on 127.0.0.1 and returns its base URL.
async fn spawn_server(tmp: &TempDir) -> String {
    let db_path = tmp.path().join("e2e.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let mut config = Config::default();
    config.database.path = Some(db_path);
    config.auth.jwt_secret = Some("e2e-secret".to_string());
    config.auth.bcrypt_cost = 4;
    config.server.cors_origin = Some("http://localhost:3000".to_string());

    let state = AppState {
        repo: Arc::new(SqliteSocialRepository::new(pool)),
        tokens: Arc::new(TokenService::new("e2e-secret", chrono::Duration::hours(1))),
        config,
    };
    let app = routes::app(state).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_session_register_post_like_follow() {
    let tmp = TempDir::new().unwrap();
    let base_url = spawn_server(&tmp).await;

    let mut u1 = Session::new(ApiClient::new(&base_url));
    u1.register("u1", "u1@example.com", "pw1").await.unwrap();
    let u1_id = u1.user_id().unwrap().to_string();

    let mut u2 = Session::new(ApiClient::new(&base_url));
    u2.register("u2", "u2@example.com", "pw2").await.unwrap();
    let u2_id = u2.user_id().unwrap().to_string();

    // Log u1 in again from a fresh session.
    let mut u1 = Session::new(ApiClient::new(&base_url));
    u1.login("u1@example.com", "pw1").await.unwrap();
    assert_eq!(u1.user_id(), Some(u1_id.as_str()));

    u1.draft = "hello".to_string();
    let post = u1.submit_draft().await.unwrap();
    assert!(u1.draft.is_empty());
    assert_eq!(post.author, u1_id);

    let listed = u1
        .feed()
        .iter()
        .find(|p| p.content == "hello")
        .expect("feed should include the new post");
    assert_eq!(listed.author.username, "u1");

    u2.refresh().await.unwrap();
    assert!(!u2.has_liked(&post.id));
    u2.like(&post.id).await.unwrap();
    assert!(u2.has_liked(&post.id));

    // Liking again is refused by the server and the session keeps its state.
    let err = u2.like(&post.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert!(err.to_string().contains("already liked"));
    assert!(u2.has_liked(&post.id));

    u1.refresh().await.unwrap();
    let likes = &u1
        .feed()
        .iter()
        .find(|p| p.id == post.id)
        .unwrap()
        .likes;
    assert_eq!(likes.iter().filter(|id| **id == u2_id).count(), 1);

    u2.follow(&u1_id).await.unwrap();
    assert!(u2.is_following(&u1_id));
    let err = u2.follow(&u1_id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(u2.following(), &[u1_id.clone()]);
}

#[tokio::test]
async fn test_session_surfaces_server_errors() {
    let tmp = TempDir::new().unwrap();
    let base_url = spawn_server(&tmp).await;

    let mut session = Session::new(ApiClient::new(&base_url));
    let err = session
        .login("nobody@example.com", "pw")
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(!session.is_logged_in());

    session
        .register("ann", "ann@example.com", "pw")
        .await
        .unwrap();
    session.draft = "   ".to_string();
    let err = session.submit_draft().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(session.draft, "   ", "rejected draft should be kept");

    let err = session.like("no-such-post").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_submit_draft_reloads_feed_from_server() {
    let tmp = TempDir::new().unwrap();
    let base_url = spawn_server(&tmp).await;

    let mut ann = Session::new(ApiClient::new(&base_url));
    ann.register("ann", "ann@example.com", "pw").await.unwrap();
    assert!(ann.feed().is_empty());

    // Posted elsewhere after ann's last refresh.
    let mut bob = Session::new(ApiClient::new(&base_url));
    bob.register("bob", "bob@example.com", "pw").await.unwrap();
    bob.draft = "from bob".to_string();
    bob.submit_draft().await.unwrap();

    ann.draft = "from ann".to_string();
    let post = ann.submit_draft().await.unwrap();

    let contents: Vec<&str> = ann.feed().iter().map(|p| p.content.as_str()).collect();
    assert_eq!(contents, ["from bob", "from ann"]);
    let own = ann.feed().iter().find(|p| p.id == post.id).unwrap();
    assert_eq!(own.author.username, "ann");
    assert_eq!(own.author.email, "ann@example.com");
}
