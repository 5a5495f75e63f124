//! Chat request, vendor completion and streaming event types.
//!
//! The inbound request is strongly typed for the fields the gateway acts on
//! (`model`, `stream`, `messages`); everything else is kept in a catch-all
//! map and forwarded upstream untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::{GatewayError, error::Result};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// An OpenAI-compatible chat completion request body.
///
/// `model` and `messages` default to empty so that validation, not
/// deserialization, reports them; the gateway substitutes its default model
/// for an empty `model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// All remaining fields (`temperature`, `max_tokens`, ...).
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ChatRequest {
    /// Build a request with no extra parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            stream: false,
            messages,
            extra: HashMap::new(),
        }
    }

    /// Reconstructs the upstream request body.
    ///
    /// The typed fields overwrite any same-named key in `extra`.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.extra.len() + 3);
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        map.insert("model".into(), Value::String(self.model.clone()));
        map.insert("stream".into(), Value::Bool(self.stream));
        map.insert(
            "messages".into(),
            serde_json::to_value(&self.messages).unwrap_or(Value::Array(Vec::new())),
        );
        Value::Object(map)
    }
}

/// One element of a streaming response, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A single upstream increment.
    Delta {
        content: String,
        finish_reason: Option<String>,
    },
    /// Terminal sentinel: the upstream finished normally.
    Done,
    /// Terminal failure; nothing follows it.
    Error { message: String },
}

impl ChatEvent {
    pub fn delta(content: impl Into<String>) -> Self {
        Self::Delta {
            content: content.into(),
            finish_reason: None,
        }
    }

    /// Returns `true` for `Done` and `Error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Token accounting reported by the upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// The upstream's non-streaming chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created: Option<u64>,
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    pub content: String,
}

impl ChatCompletion {
    /// Decode an upstream body, failing on any unexpected shape.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if the body does not contain at least
    /// one choice with a string `message.content`.
    pub fn from_value(value: Value) -> Result<Self> {
        let completion: Self =
            serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if completion.choices.is_empty() {
            return Err(GatewayError::Decode("completion has no choices".into()));
        }
        Ok(completion)
    }

    /// Content of the first choice.
    #[must_use]
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map_or("", |c| c.message.content.as_str())
    }

    /// Finish reason of the first choice.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }
}
