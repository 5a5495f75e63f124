//! Unified error type for the gigagate workspace.

use thiserror::Error;

/// Enumerates all error kinds that can occur across gigagate crates.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The client request is malformed or names an unknown model.
    #[error("{0}")]
    InvalidRequest(String),

    /// The upstream rejected the bearer token, or the identity endpoint
    /// rejected the client secret.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The upstream rejected the bearer token of the given generation.
    #[error("authentication error: credential generation {generation} rejected: {message}")]
    CredentialRejected { generation: u64, message: String },

    /// The credential was rejected again after the one permitted refresh.
    #[error("{operation}: upstream rejected the credential after re-authentication: {message}")]
    AuthExhausted {
        operation: &'static str,
        message: String,
    },

    /// A referenced binary asset does not exist upstream.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// The upstream returned a non-success status.
    #[error("upstream error: status={status}, body={body}")]
    Upstream { status: u16, body: String },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(String),

    /// The upstream payload did not have the expected shape.
    #[error("unexpected upstream response: {0}")]
    Decode(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl GatewayError {
    /// Returns `true` if the upstream rejected the credential in use.
    ///
    /// This is the only failure kind that triggers a token refresh.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::CredentialRejected { .. })
    }

    /// Generation of the credential the upstream rejected, when known.
    #[must_use]
    pub fn rejected_generation(&self) -> Option<u64> {
        match self {
            Self::CredentialRejected { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// Returns `true` if the error was caused by the client's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GatewayError>;
