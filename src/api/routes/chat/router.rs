//! Router for the chat API

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};

use crate::api::state::AppState;
use crate::core::SchedulingError;
use super::public;

type SharedState = Arc<AppState>;

/// Answer one message from the user given the history they send along
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::ChatRequest>,
) -> Result<Json<public::ChatResponse>, crate::api::public::ApiError> {
    // Reject before the LLM is ever contacted
    if payload.message.trim().is_empty() {
        return Err(SchedulingError::InvalidInput("Message must not be empty".to_string()).into());
    }

    tracing::debug!(
        "Chat message with {} prior turn(s): {}",
        payload.history.len(),
        payload.message
    );
    let reply = state
        .agent
        .respond(&payload.message, &payload.history)
        .await?;

    Ok(Json(public::ChatResponse { reply }))
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(chat_handler))
}
