//! HTTP client for the server's API and the session state a front end renders from.

pub mod api;
pub mod session;

pub use api::{ApiClient, ClientError};
pub use session::Session;
