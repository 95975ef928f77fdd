//! Copilot session configuration.

use serde::Deserialize;

use crate::mode::QueryMode;

/// What to do with partial content when a stream fails mid-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFailurePolicy {
    /// Keep the partial text exactly as received.
    #[default]
    Retain,
    /// Keep the partial text and append a visible interruption note.
    Annotate,
}

/// Configuration for a copilot session.
#[derive(Debug, Clone, Deserialize)]
pub struct CopilotConfig {
    /// Content of the seed assistant Turn.
    #[serde(default = "CopilotConfig::default_welcome_message")]
    pub welcome_message: String,

    /// Assistant Turn appended when a structured query fails.
    #[serde(default = "CopilotConfig::default_structured_error_message")]
    pub structured_error_message: String,

    /// Assistant Turn appended when a conversational query fails before streaming.
    #[serde(default = "CopilotConfig::default_stream_error_message")]
    pub stream_error_message: String,

    /// Mode selected when the session starts.
    #[serde(default)]
    pub initial_mode: QueryMode,

    /// Handling of partial content on mid-stream failure.
    #[serde(default)]
    pub partial_failure_policy: PartialFailurePolicy,

    /// Note appended under [`PartialFailurePolicy::Annotate`].
    #[serde(default = "CopilotConfig::default_partial_failure_note")]
    pub partial_failure_note: String,
}

impl CopilotConfig {
    fn default_welcome_message() -> String {
        "Hello! I am your AI Data Assistant. Ask me anything about your database schema."
            .to_string()
    }

    fn default_structured_error_message() -> String {
        "Sorry, I encountered an error.".to_string()
    }

    fn default_stream_error_message() -> String {
        "Sorry, I encountered an error communicating with the assistant.".to_string()
    }

    fn default_partial_failure_note() -> String {
        "\n\n[response interrupted]".to_string()
    }

    /// Error message for a failed cycle in the given mode.
    #[must_use]
    pub fn error_message(&self, mode: QueryMode) -> &str {
        match mode {
            QueryMode::Structured => &self.structured_error_message,
            QueryMode::Conversational => &self.stream_error_message,
        }
    }
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            welcome_message: Self::default_welcome_message(),
            structured_error_message: Self::default_structured_error_message(),
            stream_error_message: Self::default_stream_error_message(),
            initial_mode: QueryMode::default(),
            partial_failure_policy: PartialFailurePolicy::default(),
            partial_failure_note: Self::default_partial_failure_note(),
        }
    }
}
