//! Image generation handler.
//!
//! The vendor draws images as a side effect of a chat completion: the reply
//! embeds `<img src="{file id}">`, and the file is fetched separately.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use gigagate_translate::unix_timestamp;
use gigagate_types::{ChatRequest, GatewayError, Message};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};

use crate::{AppState, error::ApiError};

static IMG_SRC: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"<img src="([^"]+)""#));

/// `POST /v1/images/generations` body.
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
    /// Accepted for compatibility; one image is always returned.
    #[serde(default = "default_n")]
    pub n: u32,
    /// Accepted for compatibility; the vendor picks the resolution.
    #[serde(default = "default_size")]
    pub size: String,
    /// Sent as a system instruction ahead of the prompt.
    #[serde(default)]
    pub style: Option<String>,
}

fn default_n() -> u32 {
    1
}

fn default_size() -> String {
    "1024x1024".into()
}

impl ImageRequest {
    /// Build the chat request that asks `model` to draw.
    fn to_chat_request(&self, model: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(style) = self.style.as_deref().filter(|s| !s.is_empty()) {
            messages.push(Message::system(style));
        }
        messages.push(Message::user(self.prompt.as_str()));

        let mut request = ChatRequest::new(model, messages);
        request
            .extra
            .insert("function_call".into(), Value::String("auto".into()));
        request
    }
}

/// First `<img src="...">` reference in `content`.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the reference pattern failed to build.
pub fn extract_asset_id(content: &str) -> Result<Option<&str>, GatewayError> {
    let pattern = IMG_SRC
        .as_ref()
        .map_err(|e| GatewayError::Config(format!("image reference pattern: {e}")))?;
    Ok(pattern
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str()))
}

/// Handles `POST /v1/images/generations` requests.
///
/// # Errors
///
/// Returns [`ApiError`] with status 400 for an empty prompt or a reply
/// without an image reference, and 500 for upstream failures.
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let model = state.config.image_model.as_str();
    if request.prompt.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("No prompt provided".into()).into());
    }
    tracing::info!(
        model,
        n = request.n,
        size = %request.size,
        styled = request.style.is_some(),
        "image generation request"
    );

    let completion = state
        .upstream
        .complete_chat(&request.to_chat_request(model))
        .await
        .inspect_err(|e| {
            tracing::error!(
                model,
                operation = "images.generations",
                error = %e,
                "image generation failed"
            );
        })?;

    let asset_id = extract_asset_id(completion.content())?.ok_or_else(|| {
        tracing::warn!(model, "no image reference in upstream reply");
        GatewayError::InvalidRequest("No image ID found in response".into())
    })?;

    let bytes = state.upstream.download_asset(asset_id).await.inspect_err(|e| {
        tracing::error!(
            model,
            operation = "files.download",
            asset_id,
            error = %e,
            "image download failed"
        );
    })?;
    tracing::debug!(model, asset_id, size = bytes.len(), "image downloaded");

    let encoded = STANDARD.encode(&bytes);
    Ok(Json(json!({
        "created": unix_timestamp(),
        "data": [{
            "url": format!("data:image/jpeg;base64,{encoded}"),
            "b64_json": encoded,
        }]
    })))
}
