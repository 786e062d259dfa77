//! List endpoints
//!
//! GET /lrange/{key}         - all entries of a list (replica)
//! GET /rpush/{key}/{value}  - append to a list (primary), then read it back
//!
//! Path segments are percent-decoded and otherwise forwarded untouched.
//! The trailing-slash forms carry an empty key or value.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::{routing::get, Router};
use guestbook_store::ListStore;

use super::json_response;
use crate::policy::Failure;
use crate::state::AppState;

/// GET /lrange/{key}
async fn lrange(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    read_list(&state, &key).await
}

/// GET /lrange/
async fn lrange_empty_key(State(state): State<AppState>) -> Response {
    read_list(&state, "").await
}

/// GET /rpush/{key}/{value}
async fn rpush(
    State(state): State<AppState>,
    Path((key, value)): Path<(String, String)>,
) -> Response {
    append_then_read(&state, &key, &value).await
}

/// GET /rpush/{key}/
async fn rpush_empty_value(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    append_then_read(&state, &key, "").await
}

async fn append_then_read(state: &AppState, key: &str, value: &str) -> Response {
    let appended = ListStore::new(state.primary())
        .append_entry(key, value)
        .await
        .map_err(Failure::new);
    state.settle("rpush", appended);

    read_list(state, key).await
}

async fn read_list(state: &AppState, key: &str) -> Response {
    let read = ListStore::new(state.replica())
        .read_all(key)
        .await
        .map_err(Failure::entries);
    let entries = state.settle("lrange", read);

    json_response(state, "lrange", &entries)
}

/// List routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lrange/{key}", get(lrange))
        .route("/lrange/", get(lrange_empty_key))
        .route("/rpush/{key}/{value}", get(rpush))
        .route("/rpush/{key}/", get(rpush_empty_value))
}
