//! Upstream SSE decoding into [`ChatEvent`]s.
//!
//! Each `data:` payload is decoded into an explicit chunk type; anything
//! that does not match ends the sequence with [`ChatEvent::Error`] instead of
//! being coerced to empty content. The produced stream is finite: it stops
//! right after the first terminal event, and transport EOF counts as `Done`.

use eventsource_stream::Eventsource as _;
use futures_util::{Stream, StreamExt as _, stream};
use gigagate_types::{ChatEvent, ChatEventStream, GatewayError, error::Result};
use serde::Deserialize;
use serde_json::Value;

/// Literal payload of the upstream end-of-stream marker.
pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: String,
}

/// Decode one SSE `data:` payload.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] for malformed JSON, a chunk without
/// choices, or a delta without string `content`.
pub fn decode_data(data: &str) -> Result<ChatEvent> {
    let data = data.trim();
    if data == DONE_MARKER {
        return Ok(ChatEvent::Done);
    }

    let value: Value = serde_json::from_str(data)
        .map_err(|e| GatewayError::Decode(format!("invalid stream chunk: {e}")))?;

    // Upstream error payloads carry a message and no choices.
    if value.get("choices").is_none()
        && let Some(message) = value.get("message").and_then(Value::as_str)
    {
        return Ok(ChatEvent::Error {
            message: message.to_string(),
        });
    }

    let chunk: StreamChunk = serde_json::from_value(value)
        .map_err(|e| GatewayError::Decode(format!("unexpected stream chunk: {e}")))?;
    let choice = chunk
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Decode("stream chunk has no choices".into()))?;

    Ok(ChatEvent::Delta {
        content: choice.delta.content,
        finish_reason: choice.finish_reason,
    })
}

/// Turn an upstream SSE byte stream into a [`ChatEventStream`].
///
/// The byte stream is pulled only when the returned stream is polled, and it
/// is dropped as soon as a terminal event has been produced.
pub fn decode_event_stream<S, B, E>(bytes: S) -> ChatEventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let events = Box::pin(bytes.eventsource());

    Box::pin(stream::unfold(Some(events), |state| async move {
        let mut events = state?;
        let event = match events.next().await {
            None => ChatEvent::Done,
            Some(Ok(ev)) if ev.event == "error" => ChatEvent::Error { message: ev.data },
            Some(Ok(ev)) => decode_data(&ev.data).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "dropping upstream stream on undecodable chunk");
                ChatEvent::Error {
                    message: e.to_string(),
                }
            }),
            Some(Err(e)) => ChatEvent::Error {
                message: GatewayError::Http(e.to_string()).to_string(),
            },
        };
        let next = if event.is_terminal() {
            None
        } else {
            Some(events)
        };
        Some((event, next))
    }))
}
