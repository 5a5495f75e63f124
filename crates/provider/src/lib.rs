//! Upstream chat API client and its re-authentication wrapper.
//!
//! [`GigaChatClient`] speaks the vendor's HTTP API with whatever credential
//! is current; [`ReauthClient`] wraps any [`UpstreamClient`] and turns a
//! single credential rejection into one refresh plus one retry.
//! [`make_upstream`] assembles the two.

pub mod gigachat;
pub mod http_util;
pub mod reauth;
pub mod sse;

pub use gigachat::GigaChatClient;
pub use http_util::{ProviderHttp, build_http_client};
pub use reauth::{ReauthClient, ReauthState};

use gigagate_types::{TokenProvider, UpstreamClient};
use std::sync::Arc;

/// Create the upstream client used by the gateway: the vendor adapter behind
/// the re-authentication decorator, both sharing one credential source.
pub fn make_upstream(
    http: reqwest::Client,
    base_url: &str,
    tokens: Arc<dyn TokenProvider>,
) -> Arc<dyn UpstreamClient> {
    let inner = GigaChatClient::new(http, base_url, Arc::clone(&tokens));
    Arc::new(ReauthClient::new(inner, tokens))
}
