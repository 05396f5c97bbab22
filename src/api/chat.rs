//! Typed chat endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use super::{ApiError, ApiState, TurnResponse, trace_render};
use crate::session::Utterance;

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/", post(chat)).with_state(state)
}

/// Answer one typed question
async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let utterance = Utterance::new(request.text)
        .ok_or_else(|| ApiError::BadRequest("Empty text".to_string()))?;

    let (_turn, mut session) = state.begin_turn().await?;
    let outcome = state
        .pipeline
        .respond(&mut session, utterance, &mut trace_render)
        .await?;

    Ok(Json(outcome.into()))
}
