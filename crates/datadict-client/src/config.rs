//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the dashboard API client.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the dashboard backend.
    #[serde(default = "ClientConfig::default_base_url")]
    pub base_url: String,

    /// Path prefix of the versioned API.
    #[serde(default = "ClientConfig::default_api_prefix")]
    pub api_prefix: String,

    /// Endpoint answering structured queries, relative to the prefix.
    #[serde(default = "ClientConfig::default_structured_path")]
    pub structured_path: String,

    /// Endpoint streaming conversational answers, relative to the prefix.
    #[serde(default = "ClientConfig::default_conversational_path")]
    pub conversational_path: String,

    /// Overall timeout for non-streaming requests in seconds.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Connection timeout in seconds.
    #[serde(default = "ClientConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl ClientConfig {
    fn default_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_api_prefix() -> String {
        "/api/v1".to_string()
    }

    fn default_structured_path() -> String {
        "/sql".to_string()
    }

    fn default_conversational_path() -> String {
        "/chat/stream".to_string()
    }

    const fn default_request_timeout() -> u64 {
        60
    }

    const fn default_connect_timeout() -> u64 {
        5
    }

    /// Default configuration pointing at `base_url`.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Overall timeout for non-streaming requests.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_prefix: Self::default_api_prefix(),
            structured_path: Self::default_structured_path(),
            conversational_path: Self::default_conversational_path(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}
