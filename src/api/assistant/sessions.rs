//! Session context handlers

use axum::extract::{Path, State};

use crate::api::state::AppState;
use crate::api::types::{ApiError, ContextResponse, Json, ResetResponse};

/// GET /api/context/{session_id}
pub async fn get_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ContextResponse>, ApiError> {
    let context = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Session '{}' not found", session_id)))?;

    Ok(Json(ContextResponse {
        session_id,
        context,
    }))
}

/// POST /api/reset/{session_id}
pub async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    if !state.sessions.reset(&session_id).await {
        return Err(ApiError::not_found(format!(
            "Session '{}' not found",
            session_id
        )));
    }

    Ok(Json(ResetResponse {
        session_id,
        reset: true,
    }))
}
