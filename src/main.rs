use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use murmur::auth::token::TokenService;
use murmur::config::{Cli, Config};
use murmur::db::{self, repository::SqliteSocialRepository};
use murmur::routes;
use murmur::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let db_path = config.db_path()?;
    tracing::info!("Database: {}", db_path.display());
    let pool = db::create_pool(db_path)?;
    db::run_migrations(&pool)?;

    let tokens = TokenService::new(
        config.jwt_secret()?,
        chrono::Duration::minutes(config.auth.token_ttl_minutes),
    );

    let state = AppState {
        repo: Arc::new(SqliteSocialRepository::new(pool)),
        tokens: Arc::new(tokens),
        config: config.clone(),
    };

    let app = routes::app(state)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
