//! Route handlers organized by resource

pub mod introspect;
pub mod lists;

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::policy::Failure;
use crate::state::AppState;

/// Indented JSON body. Encoding failures go through the error policy.
pub(crate) fn json_response<T: Serialize>(
    state: &AppState,
    operation: &'static str,
    value: &T,
) -> Response {
    let body = state.settle(
        operation,
        serde_json::to_vec_pretty(value).map_err(Failure::new),
    );
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}
