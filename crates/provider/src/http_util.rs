//! Shared HTTP utilities for the upstream client.
//!
//! Centralises client construction (TLS policy, timeout, proxy) and the
//! send → status-check step so every call classifies failures the same way.

use gigagate_config::UpstreamConfig;
use gigagate_types::{GatewayError, error::Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

/// Shared HTTP helper wrapping the outbound client.
#[derive(Clone)]
pub struct ProviderHttp {
    http: Client,
}

impl ProviderHttp {
    /// Creates a new helper wrapping the given HTTP client.
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Returns a reference to the inner HTTP client for building requests.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Sends a request and checks for success status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Auth`] on `401`, [`GatewayError::Upstream`] on
    /// any other non-2xx status, or [`GatewayError::Http`] if the request
    /// fails to send.
    pub async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Auth(format!("upstream returned 401: {text}")));
        }
        Err(GatewayError::Upstream {
            status: status.as_u16(),
            body: text,
        })
    }
}

/// Build the outbound HTTP client from the upstream settings.
///
/// An unparseable `proxy_url` is logged and ignored.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the TLS backend cannot be initialised.
pub fn build_http_client(config: &UpstreamConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(!config.verify_tls)
        .timeout(Duration::from_secs(config.timeout_secs));

    if let Some(url) = config.proxy_url.as_deref() {
        match reqwest::Proxy::all(url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => {
                tracing::warn!(url = url, error = %e, "invalid proxy_url, using direct connection");
            }
        }
    }

    builder
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build http client: {e}")))
}
