//! Error type for management API calls.

use thiserror::Error;

/// Maximum response body accepted from the management API (4 MB).
pub const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("API error (code {code}): {message}")]
    Api { code: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },

    #[error("operation cancelled")]
    Cancelled,

    /// The old locator was deleted but the replacement could not be created.
    /// The remote account is left without a locator of this name.
    #[error("streaming locator '{name}' was deleted but not recreated: {source}")]
    ReplaceInterrupted {
        name: String,
        #[source]
        source: Box<MediaError>,
    },
}

impl MediaError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediaError::Cancelled)
    }
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for MediaError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Auth(format!("bearer token is not a valid header value: {err}"))
    }
}
