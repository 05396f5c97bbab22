//! Interactive session state
//!
//! A [`Session`] lives from UI load to UI close. It owns the conversation log
//! and the pending transcript queue; nothing here is process-global.

mod log;
mod queue;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use log::{ConversationLog, ConversationTurn, Utterance};
pub use queue::TranscriptQueue;

/// Session shared between request handlers
///
/// Turns hold the lock for their whole duration. Overlapping triggers are
/// gated separately by the API layer.
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// One running instance of the assistant
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    log: ConversationLog,
    queue: TranscriptQueue,
    last_error: Option<String>,
    last_audio: Option<Arc<[u8]>>,
}

impl Session {
    /// Start a new session
    #[must_use]
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, "session started");

        Self {
            id,
            started_at: Utc::now(),
            log: ConversationLog::new(),
            queue: TranscriptQueue::new(),
            last_error: None,
            last_audio: None,
        }
    }

    /// Wrap in a [`SharedSession`]
    #[must_use]
    pub fn shared(self) -> SharedSession {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub const fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub(crate) const fn log_mut(&mut self) -> &mut ConversationLog {
        &mut self.log
    }

    /// Handle to the pending transcript queue, for the producer side
    #[must_use]
    pub fn queue(&self) -> TranscriptQueue {
        self.queue.clone()
    }

    /// Message of the most recent failed step, cleared by the next success
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn set_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    /// Most recent synthesized reply audio (MP3)
    #[must_use]
    pub fn last_audio(&self) -> Option<Arc<[u8]>> {
        self.last_audio.clone()
    }

    pub(crate) fn set_audio(&mut self, audio: Option<Arc<[u8]>>) {
        self.last_audio = audio;
    }

    /// End the session, releasing its log and any unprocessed transcripts
    pub fn teardown(self) {
        let dropped = self.queue.drain().len();
        let elapsed = Utc::now() - self.started_at;
        tracing::info!(
            session_id = %self.id,
            turns = self.log.len(),
            unprocessed = dropped,
            duration_secs = elapsed.num_seconds(),
            "session ended"
        );
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
