//! Upstream bearer credential.

use secrecy::{ExposeSecret as _, SecretString};
use std::time::SystemTime;

/// A short-lived bearer token obtained from the identity endpoint.
///
/// Credentials are immutable; a refresh produces a new value with a higher
/// `generation` that replaces the old one wholesale.
#[derive(Debug)]
pub struct Credential {
    pub bearer_token: SecretString,
    pub obtained_at: SystemTime,
    /// Monotonic refresh counter. `0` means no token has been fetched yet.
    pub generation: u64,
}

impl Credential {
    /// Create a credential for a freshly issued token.
    pub fn new(bearer_token: impl Into<String>, generation: u64) -> Self {
        Self {
            bearer_token: SecretString::from(bearer_token.into()),
            obtained_at: SystemTime::now(),
            generation,
        }
    }

    /// The placeholder held before the first refresh.
    #[must_use]
    pub fn unset() -> Self {
        Self::new(String::new(), 0)
    }

    /// Return `true` if no token has been fetched yet.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.generation == 0
    }

    /// Render the `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.bearer_token.expose_secret())
    }
}
