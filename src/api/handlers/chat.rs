use crate::{
    AppState,
    types::{AppError, ChatRequest, ChatResponse, Result},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// Ask the assistant a question within a session.
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if payload.message.trim().is_empty() {
        return Err(AppError::InvalidInput("message must not be empty".into()));
    }

    let (session_id, answer) = state
        .assistant
        .ask(payload.session_id.as_deref(), &payload.message)
        .await?;

    Ok(Json(ChatResponse {
        answer: answer.text,
        citations: answer.citations,
        route: answer.route,
        degraded: answer.degraded.map(|d| d.to_string()),
        grounded: answer.grounded,
        session_id,
    }))
}

/// Forget a session's conversation memory.
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    if state.assistant.sessions().remove(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("session '{}'", session_id)))
    }
}
