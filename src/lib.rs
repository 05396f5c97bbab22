//! Parley - voice and text chat assistant
//!
//! Each turn runs a fixed pipeline against hosted services:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  microphone  │──▶│  Transcriber │──▶│  Response    │──▶│  Speech      │
//! │  / text      │   │  (Whisper)   │   │  Generator   │   │  Synthesizer │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 │
//!                         ┌───────────────────────────────────────▼───────┐
//!                         │ Session: conversation log, transcript queue   │
//!                         └───────────────────────────────────────────────┘
//! ```
//!
//! The same [`Pipeline`] backs the web API, the text REPL, push-to-talk and
//! the real-time streaming mode.

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod session;
pub mod streaming;
pub mod voice;

pub use config::Config;
pub use error::{
    ConfigError, Error, GenerationError, InvalidTurn, Result, SynthesisError, TranscriptionError,
    TurnError,
};
pub use llm::{ChatCompletionClient, GenerationParams, ResponseGenerator};
pub use pipeline::{Pipeline, Render, RenderFrame, TurnOutcome};
pub use session::{
    ConversationLog, ConversationTurn, Session, SharedSession, TranscriptQueue, Utterance,
};
pub use streaming::spawn_recognizer;
