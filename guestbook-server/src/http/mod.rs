//! HTTP server layer
//!
//! Axum server with:
//! - Four guestbook routes plus a static asset fallback
//! - Optional request tracing
//! - Graceful shutdown

pub mod routes;
pub mod server;

pub use server::{build_router, run_server, ServerConfig, ServerError};
