//! Core types and traits for the gigagate workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! gateway: the error taxonomy, the OpenAI-side chat request, the streaming
//! event model, the upstream credential, and the async traits that the auth
//! and provider layers implement.

pub mod chat;
pub mod error;
pub mod token;
pub mod traits;

pub use chat::{ChatCompletion, ChatEvent, ChatRequest, Message, Role, Usage};
pub use error::GatewayError;
pub use token::Credential;
pub use traits::{ChatEventStream, SseStream, TokenProvider, UpstreamClient};
