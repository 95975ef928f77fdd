//! Backend error types.
//!
//! These are the only failures that cross the backend seam. The dispatcher
//! absorbs every one of them into the transcript; none reach the caller.

use thiserror::Error;

/// A result type using `BackendError`.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors reported by a copilot backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail reported by the backend.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A streaming response arrived without a body.
    #[error("response has no stream body")]
    MissingBody,

    /// The byte stream terminated abnormally.
    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl BackendError {
    /// Returns `true` if resubmitting the same query might succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Stream(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) | Self::MissingBody => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_classification() {
        assert!(BackendError::Transport("timeout".into()).is_retriable());
        assert!(BackendError::Status {
            status: 503,
            message: "busy".into()
        }
        .is_retriable());
        assert!(BackendError::Status {
            status: 429,
            message: "slow down".into()
        }
        .is_retriable());
        assert!(!BackendError::Status {
            status: 422,
            message: "bad query".into()
        }
        .is_retriable());
        assert!(!BackendError::Malformed("not json".into()).is_retriable());
    }

    #[test]
    fn display_includes_status() {
        let err = BackendError::Status {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "backend returned status 500: boom");
    }
}
