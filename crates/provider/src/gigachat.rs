//! GigaChat client: OpenAI-like chat API behind a short-lived bearer token.
//!
//! Auth: `Authorization: Bearer {token}`, read from the [`TokenProvider`] at
//! call time so a refresh only affects calls issued after the swap.
//! Format: request bodies are OpenAI-shaped; responses are decoded into typed
//! values at this boundary.
use crate::{http_util::ProviderHttp, sse};
use async_trait::async_trait;
use bytes::Bytes;
use gigagate_types::{
    ChatCompletion, ChatEventStream, ChatRequest, GatewayError, TokenProvider, UpstreamClient,
    error::Result,
};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// Client for the GigaChat REST API.
pub struct GigaChatClient {
    ph: ProviderHttp,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GigaChatClient {
    /// Creates a client for `base_url` (e.g. `https://gigachat.devices.sberbank.ru/api/v1`).
    pub fn new(http: Client, base_url: &str, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            ph: ProviderHttp::new(http),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn asset_url(&self, remote_id: &str) -> String {
        format!("{}/files/{remote_id}/content", self.base_url)
    }

    fn chat_body(request: &ChatRequest, stream: bool) -> Value {
        let mut body = request.to_body();
        body["stream"] = Value::Bool(stream);
        body
    }
}

/// Asset ids are opaque tokens; anything that could alter the request path
/// is refused before it reaches the URL.
fn is_valid_asset_id(remote_id: &str) -> bool {
    !remote_id.is_empty()
        && remote_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && remote_id != "."
        && remote_id != ".."
}

/// Record which credential generation a 401 was issued for.
fn tag_rejection(err: GatewayError, generation: u64) -> GatewayError {
    match err {
        GatewayError::Auth(message) => GatewayError::CredentialRejected { generation, message },
        other => other,
    }
}

#[async_trait]
impl UpstreamClient for GigaChatClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        let credential = self.tokens.current();
        let builder = self
            .ph
            .client()
            .post(self.chat_url())
            .header("authorization", credential.authorization())
            .header("accept", "application/json")
            .json(&Self::chat_body(request, false));

        let resp = self
            .ph
            .send(builder)
            .await
            .map_err(|e| tag_rejection(e, credential.generation))?;
        let json: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("completion body: {e}")))?;
        ChatCompletion::from_value(json)
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatEventStream> {
        let credential = self.tokens.current();
        let builder = self
            .ph
            .client()
            .post(self.chat_url())
            .header("authorization", credential.authorization())
            .header("accept", "text/event-stream")
            .json(&Self::chat_body(request, true));

        let resp = self
            .ph
            .send(builder)
            .await
            .map_err(|e| tag_rejection(e, credential.generation))?;
        Ok(sse::decode_event_stream(resp.bytes_stream()))
    }

    async fn download_asset(&self, remote_id: &str) -> Result<Bytes> {
        if !is_valid_asset_id(remote_id) {
            return Err(GatewayError::Decode(format!(
                "invalid asset reference: {remote_id:?}"
            )));
        }
        let credential = self.tokens.current();
        let builder = self
            .ph
            .client()
            .get(self.asset_url(remote_id))
            .header("authorization", credential.authorization())
            .header("accept", "application/jpg");

        let sent = self
            .ph
            .send(builder)
            .await
            .map_err(|e| tag_rejection(e, credential.generation));
        let resp = match sent {
            Err(GatewayError::Upstream { status: 404, .. }) => {
                return Err(GatewayError::AssetNotFound(remote_id.to_string()));
            }
            other => other?,
        };
        Ok(resp.bytes().await?)
    }
}
