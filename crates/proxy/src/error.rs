//! API error type that maps [`GatewayError`] variants to HTTP status codes.
//!
//! Client mistakes are 400; everything that went wrong behind the gateway,
//! credential rejection included, is 500 with the failure's message.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gigagate_types::GatewayError;
use serde_json::json;

/// Wrapper around [`GatewayError`] that implements [`IntoResponse`].
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl ApiError {
    /// Returns `(status, error_type, error_code)` for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match &self.0 {
            GatewayError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
            ),
            GatewayError::Auth(_)
            | GatewayError::CredentialRejected { .. }
            | GatewayError::AuthExhausted { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "upstream_auth_failed",
            ),
            GatewayError::AssetNotFound(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "asset_not_found",
            ),
            GatewayError::Upstream { .. } | GatewayError::Http(_) | GatewayError::Decode(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "upstream_error",
            ),
            GatewayError::Serialization(_) | GatewayError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal_error",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code) = self.classify();
        let msg = self.0.to_string();
        (
            status,
            Json(json!({
                "error": {
                    "message": msg,
                    "type": error_type,
                    "code": error_code,
                }
            })),
        )
            .into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

/// A body that is not JSON, or does not fit the request shape, is a client
/// error like any other.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        tracing::warn!(status = %rejection.status(), error = %message, "rejected request body");
        Self(GatewayError::InvalidRequest(message))
    }
}
