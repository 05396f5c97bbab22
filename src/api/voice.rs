//! Voice API endpoints: push-to-talk turns and reply audio

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use super::{ApiError, ApiState, TurnResponse, trace_render};
use crate::voice::AudioFrame;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/listen", post(listen))
        .route("/audio/latest", get(latest_audio))
        .with_state(state)
}

/// Run one spoken turn
///
/// Accepts 16-bit PCM WAV in the session's capture format
async fn listen(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<TurnResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty audio data".to_string()));
    }

    let audio = AudioFrame::from_wav(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::debug!(
        duration_secs = audio.duration_secs(),
        format = ?audio.format,
        "received recording"
    );

    let (_turn, mut session) = state.begin_turn().await?;
    let outcome = state
        .pipeline
        .listen(&mut session, &audio, &mut trace_render)
        .await?;

    Ok(Json(outcome.into()))
}

/// Most recent reply audio as MP3
async fn latest_audio(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    let audio = state
        .session
        .lock()
        .await
        .last_audio()
        .ok_or(ApiError::NotFound("No reply audio available"))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "audio/mpeg")],
        audio.to_vec(),
    )
        .into_response())
}
