//! Bearer-token source for the ARM adapter.
//!
//! Acquiring tokens (client-credential exchange against the identity
//! provider) happens outside this crate; the adapter only consumes the result.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::MediaError;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a bearer token valid for the management API audience.
    async fn bearer_token(&self, cancel: &CancellationToken) -> Result<String, MediaError>;
}

/// A pre-acquired token, e.g. from `az account get-access-token`.
///
/// **The token is redacted in `Debug` output.**
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Result<Self, MediaError> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(MediaError::Auth("bearer token is empty".to_string()));
        }
        Ok(Self {
            token: trimmed.to_string(),
        })
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self, cancel: &CancellationToken) -> Result<String, MediaError> {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        Ok(self.token.clone())
    }
}
