//! Query endpoint handler

use axum::extract::State;
use tracing::debug;

use crate::api::state::{AppState, SessionRegistry};
use crate::api::types::{ApiError, Json, QueryRequest, QueryResponse, ValidatedJson};

/// POST /api/query
///
/// Answers within the caller's session, creating one when no id is given.
pub async fn ask(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let session_id = SessionRegistry::resolve_id(request.session_id.as_deref());
    debug!(session_id = %session_id, "Answering query");

    let context = state.sessions.get(&session_id).await;
    let answer = state
        .assistant
        .answer(&request.query, context.as_ref())
        .await?;

    state
        .sessions
        .record(&session_id, &request.query, &answer.answer)
        .await;

    Ok(Json(QueryResponse {
        answer: answer.answer,
        session_id,
        cached: answer.cached,
        key: answer.key.map(String::from),
    }))
}
