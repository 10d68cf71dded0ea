//! Question answering endpoints

pub mod cache;
pub mod query;
pub mod sessions;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_assistant_router() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::ask))
        .route("/cache", get(cache::stats))
        .route("/cache/clear", post(cache::clear))
        .route("/context/{session_id}", get(sessions::get_context))
        .route("/reset/{session_id}", post(sessions::reset))
}
