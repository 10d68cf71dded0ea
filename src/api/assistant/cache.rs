//! Cache administration handlers

use axum::extract::{Query, State};

use crate::api::state::AppState;
use crate::api::types::{CacheStatsResponse, ClearCacheParams, ClearCacheResponse, Json};

/// GET /api/cache
pub async fn stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        enabled: state.assistant.is_cache_enabled(),
        stats: state.assistant.cache_stats(),
    })
}

/// POST /api/cache/clear[?reset_stats=true]
pub async fn clear(
    State(state): State<AppState>,
    Query(params): Query<ClearCacheParams>,
) -> Json<ClearCacheResponse> {
    state.assistant.clear_cache(params.reset_stats);

    Json(ClearCacheResponse {
        cleared: true,
        stats: state.assistant.cache_stats(),
    })
}
