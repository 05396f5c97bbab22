//! Conversation log

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidTurn;

/// Recognized or typed text of one user turn
///
/// Always non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Utterance(String);

impl Utterance {
    /// Wrap `text`, trimmed; `None` if nothing is left
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == text.len() {
            Some(Self(text))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Utterance {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One user utterance paired with the assistant's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time
    #[must_use]
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
            at: Utc::now(),
        }
    }
}

/// Append-only, insertion-ordered record of a session's turns
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a complete turn
    ///
    /// # Errors
    ///
    /// Rejects turns with an empty user utterance or an empty reply; the log
    /// is left unchanged
    pub fn append(&mut self, turn: ConversationTurn) -> Result<(), InvalidTurn> {
        if turn.user.trim().is_empty() {
            return Err(InvalidTurn::EmptyUtterance);
        }
        if turn.assistant.trim().is_empty() {
            return Err(InvalidTurn::EmptyReply);
        }
        self.turns.push(turn);
        Ok(())
    }

    /// All turns, oldest first
    #[must_use]
    pub fn all(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Turns newest first, for display
    pub fn recent_first(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().rev()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
