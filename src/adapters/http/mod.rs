//! HTTP API adapter built on axum.

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer, HttpServerConfig};
