//! Process-wide owner of the upstream credential.
//!
//! Responsibilities:
//! - Hold the current [`Credential`] behind an atomic pointer swap so readers
//!   never observe a half-written token.
//! - Serialise refreshes: callers that fail together queue on one lock, the
//!   first performs the token exchange and the rest return its result,
//!   failure included.
//!
//! Staleness is discovered reactively (an auth failure from upstream); the
//! server-side expiry is not tracked.
use crate::oauth::{self, TokenEndpoint};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use gigagate_config::AuthConfig;
use gigagate_types::{Credential, GatewayError, TokenProvider, error::Result};
use secrecy::SecretString;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::Mutex;

pub struct CredentialProvider {
    http: reqwest::Client,
    endpoint: TokenEndpoint,
    current: ArcSwap<Credential>,
    /// Number of finished token exchanges, successful or not.
    attempts: AtomicU64,
    /// Held for the duration of a token exchange; holds the message of the
    /// last failed one.
    refresh_lock: Mutex<Option<String>>,
}

impl CredentialProvider {
    /// Creates a provider holding no token yet.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if no client secret is configured.
    pub fn new(http: reqwest::Client, config: &AuthConfig) -> Result<Self> {
        let secret = config
            .client_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Config("auth.client_secret is not set".into()))?;
        Ok(Self {
            http,
            endpoint: TokenEndpoint {
                url: config.token_url.clone(),
                scope: config.scope.clone(),
                client_secret: SecretString::from(secret),
            },
            current: ArcSwap::from_pointee(Credential::unset()),
            attempts: AtomicU64::new(0),
            refresh_lock: Mutex::new(None),
        })
    }
}

#[async_trait]
impl TokenProvider for CredentialProvider {
    fn current(&self) -> Arc<Credential> {
        self.current.load_full()
    }

    async fn refresh(&self, seen_generation: u64) -> Result<Arc<Credential>> {
        let attempts_seen = self.attempts.load(Ordering::Acquire);
        let mut last_failure = self.refresh_lock.lock().await;

        let current = self.current.load_full();
        if current.generation > seen_generation {
            tracing::debug!(
                generation = current.generation,
                seen_generation,
                "credential already refreshed by a concurrent caller"
            );
            return Ok(current);
        }
        if self.attempts.load(Ordering::Acquire) != attempts_seen
            && let Some(message) = last_failure.as_ref()
        {
            tracing::debug!(seen_generation, "sharing failed refresh of a concurrent caller");
            return Err(GatewayError::Auth(message.clone()));
        }

        let outcome = oauth::request_token(&self.http, &self.endpoint).await;
        self.attempts.fetch_add(1, Ordering::Release);
        let token = match outcome {
            Ok(token) => {
                *last_failure = None;
                token
            }
            Err(e) => {
                tracing::error!(error = %e, "credential refresh failed");
                *last_failure = Some(match &e {
                    GatewayError::Auth(message) => message.clone(),
                    other => other.to_string(),
                });
                return Err(e);
            }
        };

        let next = Arc::new(Credential::new(token, current.generation + 1));
        self.current.store(Arc::clone(&next));
        tracing::info!(generation = next.generation, "upstream credential refreshed");
        Ok(next)
    }
}
