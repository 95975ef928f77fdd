//! Client error types.

use datadict_copilot::BackendError;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the response body.
        message: String,
    },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Returns `true` if the API reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_decode() => Self::Malformed(e.to_string()),
            ClientError::Http(e) => Self::Transport(e.to_string()),
            ClientError::Api { status, message } => Self::Status { status, message },
            ClientError::Parse(message) => Self::Malformed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_status() {
        let err = ClientError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(
            BackendError::from(err),
            BackendError::Status {
                status: 503,
                message: "unavailable".into()
            }
        );
    }

    #[test]
    fn parse_error_maps_to_malformed() {
        let err = ClientError::Parse("missing field `response`".into());
        assert!(matches!(BackendError::from(err), BackendError::Malformed(_)));
    }

    #[test]
    fn not_found() {
        let err = ClientError::Api {
            status: 404,
            message: "Source not found".into(),
        };
        assert!(err.is_not_found());
        assert!(!ClientError::Parse(String::new()).is_not_found());
    }
}
