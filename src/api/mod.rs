//! HTTP API server for Parley
//!
//! Browser-facing surface over one interactive [`Session`]: typed and spoken
//! turns, conversation history and the latest reply audio.
//!
//! [`Session`]: crate::session::Session

pub mod chat;
pub mod health;
pub mod history;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use base64::Engine;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::error::{GenerationError, TranscriptionError, TurnError};
use crate::pipeline::{Pipeline, RenderFrame, TurnOutcome};
use crate::session::{Session, SharedSession};
use crate::{Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub session: SharedSession,
    pub pipeline: Arc<Pipeline>,
    /// Held for the whole of a turn; readers never touch it
    turn_gate: Arc<Mutex<()>>,
}

impl ApiState {
    /// Claim the turn gate, then the session
    ///
    /// Fails fast only when another turn holds the gate. A reader holding the
    /// session briefly just delays the turn.
    async fn begin_turn(
        &self,
    ) -> std::result::Result<(OwnedMutexGuard<()>, MutexGuard<'_, Session>), ApiError> {
        let gate = Arc::clone(&self.turn_gate).try_lock_owned().map_err(|_| {
            tracing::debug!("rejecting trigger, turn already in flight");
            ApiError::Turn(TurnError::Busy)
        })?;
        let session = self.session.lock().await;
        Ok((gate, session))
    }
}

/// Builder for [`ApiServer`]
pub struct ApiServerBuilder {
    pipeline: Arc<Pipeline>,
    session: Option<SharedSession>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Use an existing session instead of starting a new one
    #[must_use]
    pub fn session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Port to listen on
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Serve a browser front-end from this directory
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let session = self.session.unwrap_or_else(|| Session::new().shared());

        ApiServer {
            state: Arc::new(ApiState {
                session,
                pipeline: self.pipeline,
                turn_gate: Arc::new(Mutex::new(())),
            }),
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Start building a server around `pipeline`
    #[must_use]
    pub fn builder(pipeline: Arc<Pipeline>) -> ApiServerBuilder {
        ApiServerBuilder {
            pipeline,
            session: None,
            port: crate::config::DEFAULT_PORT,
            static_dir: None,
        }
    }

    /// Session served by this instance
    #[must_use]
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.state.session)
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/chat", chat::router(self.state.clone()))
            .nest("/api/history", history::router(self.state.clone()))
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(health::router());

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let router = self.router();
        let Self { state, port, .. } = self;

        let addr = format!("0.0.0.0:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(format!("failed to bind API server: {e}")))?;

        tracing::info!(port, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutdown requested");
            })
            .await
            .map_err(|e| Error::Server(format!("API server error: {e}")))?;

        let session = Arc::clone(&state.session);
        drop(state);
        match Arc::try_unwrap(session) {
            Ok(session) => session.into_inner().teardown(),
            Err(_) => tracing::debug!("session still shared, skipping teardown"),
        }

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// Render callback for HTTP turns; the browser pulls state via `/api/history`
fn trace_render(frame: &RenderFrame<'_>) {
    tracing::debug!(
        turns = frame.turns.len(),
        error = frame.error,
        has_audio = frame.audio.is_some(),
        "turn rendered"
    );
}

/// Completed turn as returned to the browser
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub user: String,
    pub assistant: String,
    /// Base64-encoded MP3, absent when synthesis failed
    pub audio: Option<String>,
    pub synthesis_error: Option<String>,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            user: outcome.turn.user,
            assistant: outcome.turn.assistant,
            audio: outcome
                .audio
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
            synthesis_error: outcome.synthesis_error.map(|e| e.to_string()),
        }
    }
}

/// API errors
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    Turn(TurnError),
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        Self::Turn(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.to_string()),
            Self::Turn(e) => {
                let (status, code) = match &e {
                    TurnError::Busy => (StatusCode::CONFLICT, "busy"),
                    TurnError::Transcription(TranscriptionError::ServiceUnavailable(_)) => {
                        (StatusCode::BAD_GATEWAY, "transcription_failed")
                    }
                    TurnError::Transcription(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "speech_not_recognized")
                    }
                    TurnError::Generation(GenerationError::InvalidRequest(_)) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "invalid_generation_request")
                    }
                    TurnError::Generation(_) | TurnError::InvalidTurn(_) => {
                        (StatusCode::BAD_GATEWAY, "generation_failed")
                    }
                };
                (status, code, e.user_message())
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}
