//! Stream relay: upstream [`ChatEvent`]s to `OpenAI` SSE frames.
//!
//! One frame per upstream delta, in arrival order. `Done` (or the upstream
//! ending) yields the `[DONE]` sentinel; `Error` yields an error frame
//! followed by the sentinel. The upstream is polled only when the consumer
//! asks for the next frame, and it is dropped as soon as it is finished or
//! the relay itself is dropped.

use crate::{completion_id, unix_timestamp};
use bytes::Bytes;
use futures_util::{StreamExt as _, stream};
use gigagate_types::{ChatEvent, ChatEventStream, SseStream};
use serde_json::json;

/// Terminal sentinel frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

enum Phase {
    Streaming(ChatEventStream),
    /// An error frame was sent; only the sentinel remains.
    Finishing,
    Closed,
}

struct State {
    phase: Phase,
    id: String,
    created: u64,
    model: String,
}

impl State {
    fn delta_frame(&self, content: &str, finish_reason: Option<&str>) -> Bytes {
        let chunk = json!({
            "id": &self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": &self.model,
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": content},
                "finish_reason": finish_reason
            }]
        });
        Bytes::from(format!("data: {chunk}\n\n"))
    }
}

fn error_frame(message: &str) -> Bytes {
    let body = json!({"error": {"message": message, "type": "server_error"}});
    Bytes::from(format!("data: {body}\n\n"))
}

/// Re-frame `events` as downstream SSE bytes for `model`.
pub fn relay(events: ChatEventStream, model: impl Into<String>) -> SseStream {
    let state = State {
        phase: Phase::Streaming(events),
        id: completion_id(),
        created: unix_timestamp(),
        model: model.into(),
    };

    Box::pin(stream::unfold(state, |mut s| async move {
        match std::mem::replace(&mut s.phase, Phase::Closed) {
            Phase::Closed => None,
            Phase::Finishing => Some((Bytes::from_static(DONE_FRAME.as_bytes()), s)),
            Phase::Streaming(mut events) => match events.next().await {
                Some(ChatEvent::Delta {
                    content,
                    finish_reason,
                }) => {
                    let frame = s.delta_frame(&content, finish_reason.as_deref());
                    s.phase = Phase::Streaming(events);
                    Some((frame, s))
                }
                Some(ChatEvent::Error { message }) => {
                    tracing::error!(model = %s.model, error = %message, "upstream stream failed");
                    s.phase = Phase::Finishing;
                    Some((error_frame(&message), s))
                }
                Some(ChatEvent::Done) | None => {
                    Some((Bytes::from_static(DONE_FRAME.as_bytes()), s))
                }
            },
        }
    }))
}
