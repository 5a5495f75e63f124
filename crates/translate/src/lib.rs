//! Response translators from the GigaChat API to the `OpenAI` wire format.
//!
//! [`gigachat_to_openai`] renders complete responses; [`relay`] re-frames a
//! live [`ChatEventStream`](gigagate_types::ChatEventStream) as `OpenAI`
//! server-sent events. Neither performs I/O of its own.

pub mod gigachat_to_openai;
pub mod relay;

pub use gigachat_to_openai::completion_to_openai;
pub use relay::{DONE_FRAME, relay};

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, as used in `created` fields.
#[must_use]
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// A fresh `chatcmpl-<uuid>` response id.
#[must_use]
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4())
}
