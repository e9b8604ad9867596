// Library exports for murmur
// This allows integration tests and front ends to use the server and client modules

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
