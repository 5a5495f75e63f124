//! Client-credentials token exchange against the vendor identity endpoint.
//!
//! `POST` with `Authorization: Basic <secret>`, a fresh `RqUID` request id and
//! a form-encoded `scope`. The response carries `access_token` and an
//! `expires_at` timestamp in milliseconds which the gateway does not track.

use gigagate_types::{GatewayError, error::Result};
use secrecy::{ExposeSecret as _, SecretString};

/// Request-id header required by the identity endpoint.
pub const RQUID_HEADER: &str = "RqUID";

/// Everything needed to mint a token.
#[derive(Debug)]
pub struct TokenEndpoint {
    pub url: String,
    pub scope: String,
    pub client_secret: SecretString,
}

/// Form body for the token request.
#[must_use]
pub fn token_form_params(scope: &str) -> [(&'static str, &str); 1] {
    [("scope", scope)]
}

/// Parse the token endpoint JSON response into the bearer token.
///
/// # Errors
///
/// Returns [`GatewayError::Auth`] if `access_token` is missing or empty.
pub fn parse_token_response(json: &serde_json::Value) -> Result<String> {
    json.get("access_token")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Auth("missing access_token in token response".into()))
}

/// Exchange the client secret for a new bearer token.
///
/// # Errors
///
/// Returns [`GatewayError::Auth`] if the endpoint is unreachable, rejects the
/// secret, or answers with an unparseable body.
pub async fn request_token(http: &reqwest::Client, endpoint: &TokenEndpoint) -> Result<String> {
    let resp = http
        .post(&endpoint.url)
        .header("accept", "application/json")
        .header(RQUID_HEADER, uuid::Uuid::new_v4().to_string())
        .header(
            "authorization",
            format!("Basic {}", endpoint.client_secret.expose_secret()),
        )
        .form(&token_form_params(&endpoint.scope))
        .send()
        .await
        .map_err(|e| GatewayError::Auth(format!("token endpoint unreachable: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(GatewayError::Auth(format!(
            "token endpoint returned {status}: {text}"
        )));
    }

    let json: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| GatewayError::Auth(format!("failed to parse token response: {e}")))?;

    parse_token_response(&json)
}
