//! Translates GigaChat chat completions into OpenAI-compatible format.

use crate::{completion_id, unix_timestamp};
use gigagate_types::ChatCompletion;
use serde_json::{Value, json};

/// Render a vendor completion as an `OpenAI` `chat.completion` object.
///
/// `model` is the model the client asked for; the upstream echoes a
/// versioned name (`GigaChat:1.0.26.20`) that clients do not know about.
#[must_use]
pub fn completion_to_openai(completion: &ChatCompletion, model: &str) -> Value {
    let usage = completion.usage.unwrap_or_default();
    json!({
        "id": completion_id(),
        "object": "chat.completion",
        "created": completion.created.unwrap_or_else(unix_timestamp),
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": completion.content()},
            "finish_reason": completion.finish_reason().unwrap_or("stop")
        }],
        "usage": {
            "prompt_tokens": usage.prompt_tokens,
            "completion_tokens": usage.completion_tokens,
            "total_tokens": usage.total_tokens
        }
    })
}
