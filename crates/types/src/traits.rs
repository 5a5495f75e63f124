//! Async traits shared across all gigagate crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `gigagate-types`, not on each other.

use crate::{ChatCompletion, ChatEvent, ChatRequest, Credential, error::Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use std::{pin::Pin, sync::Arc};

/// A lazily produced, non-restartable sequence of chat events.
///
/// Dropping the stream releases the upstream connection behind it.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// A pinned, sendable stream of downstream SSE frames.
pub type SseStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Owns the process-wide upstream credential.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The credential in effect right now.
    fn current(&self) -> Arc<Credential>;

    /// Replace the credential with a freshly issued one.
    ///
    /// `seen_generation` is the generation the caller was using when it
    /// observed the failure. If the current credential is already newer the
    /// call returns it without contacting the identity endpoint, so callers
    /// that fail together share a single refresh. Callers that queued behind
    /// a failed exchange receive its error instead of starting another.
    async fn refresh(&self, seen_generation: u64) -> Result<Arc<Credential>>;
}

/// The operations the gateway needs from the upstream chat API.
///
/// Implementations attach the current credential at call time.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issue one non-streaming completion.
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatCompletion>;

    /// Open a streaming completion.
    ///
    /// Failures before the first byte (including auth failures) are returned
    /// as `Err`; failures after that arrive in-band as [`ChatEvent::Error`].
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatEventStream>;

    /// Download a previously referenced binary asset.
    async fn download_asset(&self, remote_id: &str) -> Result<Bytes>;
}
