//! Query mode selection.
//!
//! The mode decides which backend protocol the next submission uses. It is
//! captured at dispatch time, so changing it never affects a cycle already
//! in flight.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Protocol used for a copilot submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Single request, single complete answer (SQL generation).
    #[default]
    Structured,
    /// Natural-language answer streamed back incrementally.
    Conversational,
}

impl QueryMode {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Conversational => "conversational",
        }
    }

    /// Short label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Structured => "SQL",
            Self::Conversational => "CHAT",
        }
    }

    /// The other mode.
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Structured => Self::Conversational,
            Self::Conversational => Self::Structured,
        }
    }

    /// Whether answers in this mode arrive as a byte stream.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Conversational)
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown query mode: {0}")]
pub struct ParseModeError(String);

impl FromStr for QueryMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "sql" => Ok(Self::Structured),
            "conversational" | "chat" => Ok(Self::Conversational),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_structured() {
        assert_eq!(QueryMode::default(), QueryMode::Structured);
    }

    #[test]
    fn toggle_flips_and_returns() {
        let mode = QueryMode::Structured;
        assert_eq!(mode.toggle(), QueryMode::Conversational);
        assert_eq!(mode.toggle().toggle(), mode);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("sql".parse::<QueryMode>().unwrap(), QueryMode::Structured);
        assert_eq!("Chat".parse::<QueryMode>().unwrap(), QueryMode::Conversational);
        assert_eq!(
            " conversational ".parse::<QueryMode>().unwrap(),
            QueryMode::Conversational
        );
        assert!("graph".parse::<QueryMode>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&QueryMode::Conversational).unwrap();
        assert_eq!(json, "\"conversational\"");
        let mode: QueryMode = serde_json::from_str("\"structured\"").unwrap();
        assert_eq!(mode, QueryMode::Structured);
    }

    #[test]
    fn only_conversational_streams() {
        assert!(QueryMode::Conversational.is_streaming());
        assert!(!QueryMode::Structured.is_streaming());
    }
}
