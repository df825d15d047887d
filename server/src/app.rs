use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{form, handlers, state::AppState};

/// Routes for the upload form and the upload endpoint.
///
/// `body_limit` caps request bodies in bytes; `None` lifts axum's default
/// limit entirely so uploads of any size are accepted.
pub fn build_router(state: AppState, body_limit: Option<usize>) -> Router {
    let limit = match body_limit {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(form::upload_form))
        .route("/upload", post(handlers::upload_file))
        .layer(limit)
        .with_state(state)
}
