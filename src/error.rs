//! Error types for Parley
//!
//! Per-turn failures (transcription, generation, synthesis) are recoverable and
//! reported at the turn boundary. Configuration failures are fatal at startup.

use thiserror::Error;

/// Result type alias for Parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server error
    #[error("server error: {0}")]
    Server(String),
}

/// Startup configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required secret is absent from the environment
    #[error("missing required secret {name}: set it in the environment or a .env file")]
    MissingSecret {
        /// Environment variable name
        name: &'static str,
    },

    /// A setting has an unusable value
    #[error("invalid setting {name}: {reason}")]
    Invalid {
        /// Setting name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Speech-to-text failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    /// Audio does not match the session's negotiated format
    #[error("audio format error: {0}")]
    Format(String),

    /// Speech could not be understood
    #[error("speech was not recognized")]
    Unrecognized,

    /// Recognition service failed or is unreachable
    #[error("speech recognition service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No speech within the listening window
    #[error("no speech detected within {secs}s")]
    Timeout {
        /// Length of the listening window in seconds
        secs: u64,
    },
}

/// Chat completion failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Upstream returned no candidate completion
    #[error("no response received from the chat completion service")]
    EmptyResponse,

    /// Transport, auth, rate limit or other upstream failure
    #[error("chat completion service error{}: {message}", status_suffix(.status))]
    Upstream {
        /// HTTP status when the service answered
        status: Option<u16>,
        /// Error detail
        message: String,
    },

    /// Request parameters out of range
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
}

/// Text-to-speech failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Non-success HTTP status from the synthesis service
    #[error("speech synthesis failed with status {status_code}")]
    Status {
        /// HTTP status code
        status_code: u16,
    },

    /// Request never got a response
    #[error("speech synthesis request failed: {0}")]
    Transport(String),

    /// Text or voice settings rejected before sending
    #[error("invalid synthesis request: {0}")]
    InvalidRequest(String),
}

/// Rejected log append
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTurn {
    /// User side of the turn is empty
    #[error("turn has an empty user utterance")]
    EmptyUtterance,

    /// Assistant side of the turn is empty
    #[error("turn has an empty assistant reply")]
    EmptyReply,
}

/// Failure of one conversational turn
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// Turn failed while recognizing speech
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    /// Turn failed while generating the reply
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The log refused the turn
    #[error(transparent)]
    InvalidTurn(#[from] InvalidTurn),

    /// Another turn is already in flight
    #[error("another request is already being processed")]
    Busy,
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

impl TranscriptionError {
    /// Message shown to the user for this failure
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unrecognized => "Sorry, I couldn't understand what you said.".to_string(),
            Self::ServiceUnavailable(e) => {
                format!("Error with the speech recognition service: {e}")
            }
            Self::Timeout { .. } => "No speech detected within the timeout period.".to_string(),
            Self::Format(e) => format!("Unsupported audio: {e}"),
        }
    }
}

impl TurnError {
    /// Message shown to the user for this failure
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transcription(e) => e.user_message(),
            Self::Generation(GenerationError::EmptyResponse) => {
                "No valid response received from the assistant.".to_string()
            }
            Self::Generation(e) => format!("Error from the assistant: {e}"),
            Self::InvalidTurn(e) => format!("Turn was not recorded: {e}"),
            Self::Busy => "Still working on the previous request.".to_string(),
        }
    }
}
