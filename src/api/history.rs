//! Conversation history endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use uuid::Uuid;

use super::ApiState;
use crate::session::ConversationTurn;

/// Session history, newest turn first
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub turns: Vec<ConversationTurn>,
    /// Message from the most recent failed step
    pub error: Option<String>,
}

/// Build history router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/", get(history)).with_state(state)
}

async fn history(State(state): State<Arc<ApiState>>) -> Json<HistoryResponse> {
    let session = state.session.lock().await;

    Json(HistoryResponse {
        session_id: session.id(),
        turns: session.log().recent_first().cloned().collect(),
        error: session.last_error().map(ToString::to_string),
    })
}
