use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::token::TokenService;
use crate::config::Config;
use crate::db::repository::SocialRepository;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn SocialRepository>,
    pub tokens: Arc<TokenService>,
    pub config: Config,
}
