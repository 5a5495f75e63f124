//! Chat completions handler: validates the request and relays it upstream.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt as _;
use gigagate_config::Config;
use gigagate_translate::{completion_to_openai, relay};
use gigagate_types::{ChatRequest, GatewayError};
use std::{convert::Infallible, sync::Arc};

use crate::{AppState, error::ApiError};

/// Check `request` against the catalog, filling in the default model.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an empty message list or a
/// model outside the catalog.
pub fn validate_request(config: &Config, request: &mut ChatRequest) -> Result<(), GatewayError> {
    if request.messages.is_empty() {
        return Err(GatewayError::InvalidRequest("No messages provided".into()));
    }
    if request.model.is_empty() {
        request.model.clone_from(&config.default_model);
    }
    if !config.is_known_model(&request.model) {
        return Err(GatewayError::InvalidRequest(format!(
            "Invalid model '{}'. Available models: {}",
            request.model,
            config.models.join(", ")
        )));
    }
    Ok(())
}

/// Handles `POST /v1/chat/completions` requests.
///
/// Returns either a complete JSON response or an SSE stream, per the
/// request's `stream` flag.
///
/// # Errors
///
/// Returns [`ApiError`] if the request is invalid or the upstream call fails
/// before any output was produced.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(mut request) = payload?;
    validate_request(&state.config, &mut request).inspect_err(|e| {
        tracing::warn!(model = %request.model, error = %e, "rejected chat completion request");
    })?;

    tracing::info!(
        model = %request.model,
        stream = request.stream,
        messages = request.messages.len(),
        "chat completion request"
    );

    if request.stream {
        let events = state.upstream.stream_chat(&request).await.inspect_err(|e| {
            tracing::error!(
                model = %request.model,
                operation = "chat.completions.stream",
                error = %e,
                "chat completion failed"
            );
        })?;
        let frames = relay(events, request.model).map(Ok::<_, Infallible>);
        return Ok((
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
                (header::TRANSFER_ENCODING, "chunked"),
            ],
            Body::from_stream(frames),
        )
            .into_response());
    }

    let completion = state.upstream.complete_chat(&request).await.inspect_err(|e| {
        tracing::error!(
            model = %request.model,
            operation = "chat.completions",
            error = %e,
            "chat completion failed"
        );
    })?;
    tracing::debug!(model = %request.model, "chat completion complete");
    Ok(Json(completion_to_openai(&completion, &request.model)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gigagate_types::Message;

    fn request(model: &str, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(model, messages)
    }

    #[test]
    fn test_empty_messages_rejected() {
        let mut req = request("GigaChat", vec![]);
        let err = validate_request(&Config::default(), &mut req).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "No messages provided");
    }

    #[test]
    fn test_unknown_model_lists_catalog() {
        let mut req = request("gpt-4o", vec![Message::user("hi")]);
        let err = validate_request(&Config::default(), &mut req).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'gpt-4o'"));
        assert!(msg.contains("GigaChat, GigaChat-Pro, GigaChat-Max"));
    }

    #[test]
    fn test_missing_model_uses_default() {
        let mut req = request("", vec![Message::user("hi")]);
        validate_request(&Config::default(), &mut req).unwrap();
        assert_eq!(req.model, "GigaChat");
    }

    #[test]
    fn test_known_model_kept() {
        let mut req = request("GigaChat-Pro", vec![Message::user("hi")]);
        validate_request(&Config::default(), &mut req).unwrap();
        assert_eq!(req.model, "GigaChat-Pro");
    }
}
