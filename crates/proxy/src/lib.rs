//! HTTP proxy layer: axum router, route handlers, and error mapping.
//!
//! Exposes an OpenAI-compatible `/v1/chat/completions` endpoint, a
//! `/v1/models` listing and `/v1/images/generations`, all served from one
//! upstream client.

mod chat;
mod error;
mod images;
mod models;

pub use chat::validate_request;
pub use error::ApiError;
pub use images::{ImageRequest, extract_asset_id};

use axum::{
    Router,
    routing::{get, post},
};
use gigagate_config::Config;
use gigagate_types::UpstreamClient;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state passed to all route handlers.
pub struct AppState {
    /// Server configuration, read once at startup.
    pub config: Config,
    /// Upstream client, already wrapped for re-authentication.
    pub upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    /// Creates a new shared application state wrapped in an `Arc`.
    pub fn new(config: Config, upstream: Arc<dyn UpstreamClient>) -> Arc<Self> {
        Arc::new(Self { config, upstream })
    }
}

/// Build the full axum router.
///
/// Routes:
/// - POST /v1/chat/completions
/// - GET  /v1/models
/// - POST /v1/images/generations
pub fn make_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models))
        .route("/v1/images/generations", post(images::generate_image))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bytes::Bytes;
    use futures_util::stream;
    use gigagate_types::{
        ChatCompletion, ChatEvent, ChatEventStream, ChatRequest, GatewayError, Role,
        error::Result,
    };
    use http_body_util::BodyExt as _;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt as _;

    /// Canned upstream that records the requests it receives.
    #[derive(Default)]
    struct FakeUpstream {
        reply: String,
        events: Vec<ChatEvent>,
        asset: Option<Vec<u8>>,
        fail_with_auth: bool,
        seen: Mutex<Vec<ChatRequest>>,
        downloads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UpstreamClient for FakeUpstream {
        async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail_with_auth {
                return Err(GatewayError::AuthExhausted {
                    operation: "chat.completions",
                    message: "authentication error: upstream returned 401".into(),
                });
            }
            ChatCompletion::from_value(json!({
                "model": "GigaChat:1.0.26.20",
                "choices": [{"message": {"content": self.reply}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
            }))
        }

        async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatEventStream> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(Box::pin(stream::iter(self.events.clone())))
        }

        async fn download_asset(&self, remote_id: &str) -> Result<Bytes> {
            self.downloads.lock().unwrap().push(remote_id.to_string());
            self.asset
                .clone()
                .map(Bytes::from)
                .ok_or_else(|| GatewayError::AssetNotFound(remote_id.to_string()))
        }
    }

    fn app(upstream: FakeUpstream) -> (Router, Arc<FakeUpstream>) {
        let upstream = Arc::new(upstream);
        let shared: Arc<dyn UpstreamClient> = upstream.clone();
        (make_router(AppState::new(Config::default(), shared)), upstream)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_bytes(resp: axum::response::Response) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    #[tokio::test]
    async fn test_list_models() {
        let (app, _) = app(FakeUpstream::default());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["object"], "list");
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        let ids: Vec<_> = data.iter().map(|m| m["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["GigaChat", "GigaChat-Pro", "GigaChat-Max"]);
        for model in data {
            assert_eq!(model["root"], model["id"]);
            assert_eq!(model["owned_by"], "Sber");
            assert_eq!(model["object"], "model");
            assert_eq!(model["permission"], json!([]));
            assert!(model["parent"].is_null());
        }
    }

    #[tokio::test]
    async fn test_chat_empty_messages_returns_400() {
        let (app, upstream) = app(FakeUpstream::default());
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({"model": "GigaChat", "messages": []}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["message"], "No messages provided");
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_unknown_model_returns_400() {
        let (app, _) = app(FakeUpstream::default());
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({
                    "model": "nonexistent-model-xyz",
                    "messages": [{"role": "user", "content": "hi"}]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(
            json["error"]["message"]
                .as_str()
                .unwrap_or("")
                .contains("nonexistent-model-xyz")
        );
    }

    async fn assert_malformed_chat_body(body: Body, content_type: &str) {
        let (app, upstream) = app(FakeUpstream::default());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/completions")
                    .header("content-type", content_type)
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "invalid_request");
        assert!(!json["error"]["message"].as_str().unwrap().is_empty());
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_messages_not_a_list_returns_400() {
        let body = json!({"model": "GigaChat", "messages": "hi"});
        assert_malformed_chat_body(Body::from(body.to_string()), "application/json").await;
    }

    #[tokio::test]
    async fn test_chat_null_messages_returns_400() {
        let body = json!({"model": "GigaChat", "messages": null});
        assert_malformed_chat_body(Body::from(body.to_string()), "application/json").await;
    }

    #[tokio::test]
    async fn test_chat_unknown_role_returns_400() {
        let body = json!({
            "model": "GigaChat",
            "messages": [{"role": "narrator", "content": "hi"}]
        });
        assert_malformed_chat_body(Body::from(body.to_string()), "application/json").await;
    }

    #[tokio::test]
    async fn test_chat_non_json_body_returns_400() {
        assert_malformed_chat_body(Body::from("model=GigaChat"), "application/json").await;
    }

    #[tokio::test]
    async fn test_chat_missing_content_type_returns_400() {
        let body = json!({"messages": [{"role": "user", "content": "hi"}]});
        assert_malformed_chat_body(Body::from(body.to_string()), "text/plain").await;
    }

    #[tokio::test]
    async fn test_image_malformed_body_returns_400() {
        let (app, upstream) = app(FakeUpstream::default());
        let resp = app
            .oneshot(post_json("/v1/images/generations", &json!({"prompt": 42})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let (app, upstream) = app(FakeUpstream {
            reply: "Здравствуйте!".into(),
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({
                    "model": "GigaChat-Pro",
                    "messages": [{"role": "user", "content": "Привет"}],
                    "temperature": 0.3
                }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["model"], "GigaChat-Pro");
        assert_eq!(json["choices"][0]["message"]["content"], "Здравствуйте!");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert_eq!(json["usage"]["total_tokens"], 8);

        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen[0].model, "GigaChat-Pro");
        assert_eq!(seen[0].messages[0].role, Role::User);
        assert_eq!(seen[0].extra["temperature"], 0.3);
    }

    #[tokio::test]
    async fn test_chat_missing_model_uses_default() {
        let (app, upstream) = app(FakeUpstream {
            reply: "ok".into(),
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(upstream.seen.lock().unwrap()[0].model, "GigaChat");
    }

    #[tokio::test]
    async fn test_chat_auth_exhausted_returns_500() {
        let (app, _) = app(FakeUpstream {
            fail_with_auth: true,
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({"model": "GigaChat", "messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "upstream_auth_failed");
    }

    #[tokio::test]
    async fn test_chat_stream() {
        let (app, upstream) = app(FakeUpstream {
            events: vec![
                ChatEvent::delta("Раз"),
                ChatEvent::delta(""),
                ChatEvent::delta("два"),
                ChatEvent::Done,
            ],
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({
                    "model": "GigaChat",
                    "stream": true,
                    "messages": [{"role": "user", "content": "Считай"}]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache");
        assert_eq!(headers["connection"], "keep-alive");
        assert_eq!(headers["transfer-encoding"], "chunked");

        let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
        let frames: Vec<&str> = body.split_terminator("\n\n").collect();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3], "data: [DONE]");
        let contents: Vec<String> = frames[..3]
            .iter()
            .map(|f| {
                let chunk: Value = serde_json::from_str(f.strip_prefix("data: ").unwrap()).unwrap();
                chunk["choices"][0]["delta"]["content"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(contents, vec!["Раз", "", "два"]);
        assert!(upstream.seen.lock().unwrap()[0].stream);
    }

    #[tokio::test]
    async fn test_chat_stream_error_is_framed() {
        let (app, _) = app(FakeUpstream {
            events: vec![
                ChatEvent::delta("part"),
                ChatEvent::Error {
                    message: "connection reset".into(),
                },
            ],
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/chat/completions",
                &json!({
                    "model": "GigaChat",
                    "stream": true,
                    "messages": [{"role": "user", "content": "hi"}]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
        let frames: Vec<&str> = body.split_terminator("\n\n").collect();
        assert_eq!(frames.len(), 3);
        assert!(frames[1].contains("connection reset"));
        assert_eq!(frames[2], "data: [DONE]");
    }

    #[tokio::test]
    async fn test_image_generation() {
        let (app, upstream) = app(FakeUpstream {
            reply: r#"Вот ваш кот <img src="file-42" fuse="true"/>"#.into(),
            asset: Some(vec![0xFF, 0xD8, 0xFF, 0xE0]),
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/images/generations",
                &json!({"prompt": "Нарисуй кота", "style": "акварель", "size": "512x512"}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["b64_json"], "/9j/4A==");
        assert_eq!(data[0]["url"], "data:image/jpeg;base64,/9j/4A==");
        assert!(json["created"].as_u64().unwrap() > 0);

        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen[0].model, "GigaChat-Max");
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert_eq!(seen[0].extra["function_call"], "auto");
        assert_eq!(*upstream.downloads.lock().unwrap(), vec!["file-42"]);
    }

    #[tokio::test]
    async fn test_image_without_reference_returns_400() {
        let (app, upstream) = app(FakeUpstream {
            reply: "Не могу нарисовать.".into(),
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/images/generations",
                &json!({"prompt": "Нарисуй кота"}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(upstream.downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_missing_asset_returns_500() {
        let (app, _) = app(FakeUpstream {
            reply: r#"<img src="gone"/>"#.into(),
            ..FakeUpstream::default()
        });
        let resp = app
            .oneshot(post_json(
                "/v1/images/generations",
                &json!({"prompt": "Нарисуй кота"}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "asset_not_found");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (app, _) = app(FakeUpstream::default());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/v1/chat/completions")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }
}
