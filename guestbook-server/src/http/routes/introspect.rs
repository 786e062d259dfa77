//! Introspection endpoints
//!
//! GET /info - raw INFO output of the primary store
//! GET /env  - process environment as a JSON object

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};

use super::json_response;
use crate::env::EnvironmentSnapshot;
use crate::policy::Failure;
use crate::state::AppState;

/// GET /info
async fn info(State(state): State<AppState>) -> Response {
    let info = state.settle("info", state.primary().info().await.map_err(Failure::new));
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], info).into_response()
}

/// GET /env
async fn env(State(state): State<AppState>) -> Response {
    json_response(&state, "env", &EnvironmentSnapshot::capture())
}

/// Introspection routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route("/env", get(env))
}
