//! Re-authentication decorator: one credential refresh and one retry per call.
//!
//! Every operation starts `Fresh`. An auth failure moves it to `Retrying`,
//! which refreshes the credential and repeats the call once; a second auth
//! failure moves it to `Exhausted` and surfaces
//! [`GatewayError::AuthExhausted`]. Other errors pass through untouched.

use async_trait::async_trait;
use bytes::Bytes;
use gigagate_types::{
    ChatCompletion, ChatEventStream, ChatRequest, GatewayError, TokenProvider, UpstreamClient,
    error::Result,
};
use std::{future::Future, sync::Arc};

/// Per-call re-authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthState {
    /// First attempt with the current credential.
    Fresh,
    /// The credential was refreshed; this is the only retry.
    Retrying,
    /// The retry was rejected as well.
    Exhausted,
}

impl ReauthState {
    /// Transition taken when an attempt fails with an auth error.
    #[must_use]
    pub fn after_auth_failure(self) -> Self {
        match self {
            Self::Fresh => Self::Retrying,
            Self::Retrying | Self::Exhausted => Self::Exhausted,
        }
    }
}

/// Wraps an [`UpstreamClient`] with refresh-and-retry on credential rejection.
pub struct ReauthClient<C> {
    inner: C,
    tokens: Arc<dyn TokenProvider>,
}

impl<C> ReauthClient<C> {
    pub fn new(inner: C, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { inner, tokens }
    }

    async fn with_reauth<T, F, Fut>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut state = ReauthState::Fresh;
        loop {
            let loaded_generation = self.tokens.current().generation;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_auth_failure() => e,
                Err(e) => return Err(e),
            };
            // The inner client may have picked up a newer credential than the
            // one loaded above; refresh against the one actually rejected.
            let seen_generation = err.rejected_generation().unwrap_or(loaded_generation);

            state = state.after_auth_failure();
            if state == ReauthState::Exhausted {
                tracing::error!(operation, error = %err, "credential rejected after refresh");
                return Err(GatewayError::AuthExhausted {
                    operation,
                    message: err.to_string(),
                });
            }

            tracing::warn!(
                operation,
                generation = seen_generation,
                error = %err,
                "credential rejected, refreshing"
            );
            self.tokens.refresh(seen_generation).await?;
        }
    }
}

#[async_trait]
impl<C: UpstreamClient> UpstreamClient for ReauthClient<C> {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.with_reauth("chat.completions", move || self.inner.complete_chat(request))
            .await
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatEventStream> {
        self.with_reauth("chat.completions.stream", move || {
            self.inner.stream_chat(request)
        })
        .await
    }

    async fn download_asset(&self, remote_id: &str) -> Result<Bytes> {
        self.with_reauth("files.download", move || self.inner.download_asset(remote_id))
            .await
    }
}
