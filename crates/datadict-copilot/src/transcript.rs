//! Ordered, append-only conversation log.
//!
//! The transcript is the single source of truth for what the presentation
//! layer renders. Turns are only ever appended; the one exception to
//! immutability is the open assistant Turn, which receives streamed text
//! until it is closed. An open Turn is always the last Turn.

use serde::{Deserialize, Serialize};

/// Author of a Turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Text produced by the copilot (or a synthetic error message).
    Assistant,
}

impl Role {
    /// Lowercase role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message unit in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who authored the Turn.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Turn {
    /// Create a user Turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant Turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Check if this is a user Turn.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered, non-empty sequence of Turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
    /// Whether the last Turn is open for streamed increments.
    open: bool,
}

impl Transcript {
    /// Create a transcript holding only the assistant welcome Turn.
    #[must_use]
    pub fn seeded(welcome: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::assistant(welcome)],
            open: false,
        }
    }

    /// All Turns in insertion order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of Turns. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always `false`; a transcript keeps at least its seed Turn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent Turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Whether an assistant Turn is currently receiving increments.
    #[must_use]
    pub const fn has_open_turn(&self) -> bool {
        self.open
    }

    /// Content of the open Turn, if any.
    #[must_use]
    pub fn open_content(&self) -> Option<&str> {
        if self.open {
            self.turns.last().map(|t| t.content.as_str())
        } else {
            None
        }
    }

    /// Append a complete Turn, closing any open Turn first.
    pub fn push(&mut self, turn: Turn) {
        self.open = false;
        self.turns.push(turn);
    }

    /// Append an empty assistant Turn and mark it open.
    pub fn open_assistant(&mut self) {
        self.turns.push(Turn::assistant(String::new()));
        self.open = true;
    }

    /// Append text to the open Turn.
    ///
    /// Returns `false` (and changes nothing) if no Turn is open.
    pub fn append_to_open(&mut self, text: &str) -> bool {
        if !self.open {
            return false;
        }
        match self.turns.last_mut() {
            Some(turn) => {
                turn.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Close the open Turn. Further increments are rejected.
    pub fn close_open(&mut self) {
        self.open = false;
    }
}
