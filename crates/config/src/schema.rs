use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use gigagate_types::GatewayError;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// Prefix for environment overrides, e.g. `GIGAGATE_AUTH__CLIENT_SECRET`.
pub const ENV_PREFIX: &str = "GIGAGATE_";

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_models() -> Vec<String> {
    ["GigaChat", "GigaChat-Pro", "GigaChat-Max"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_model() -> String {
    "GigaChat".to_string()
}
fn default_image_model() -> String {
    "GigaChat-Max".to_string()
}

/// Credentials for the OAuth identity endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base64 `client_id:client_secret` pair sent as HTTP basic auth.
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(default = "AuthConfig::default_token_url")]
    pub token_url: String,
    #[serde(default = "AuthConfig::default_scope")]
    pub scope: String,
}

impl AuthConfig {
    fn default_token_url() -> String {
        "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string()
    }
    fn default_scope() -> String {
        "GIGACHAT_API_PERS".to_string()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secret: None,
            token_url: Self::default_token_url(),
            scope: Self::default_scope(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Where and how to reach the chat API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "UpstreamConfig::default_base_url")]
    pub base_url: String,
    /// Verify upstream TLS certificates. Off by default: the vendor's chain is
    /// signed by a national CA that stock trust stores do not ship.
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "UpstreamConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional outbound proxy URL (`http://`, `https://` or `socks5://`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl UpstreamConfig {
    fn default_base_url() -> String {
        "https://gigachat.devices.sberbank.ru/api/v1".to_string()
    }
    fn default_timeout_secs() -> u64 {
        120
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            verify_tls: false,
            timeout_secs: Self::default_timeout_secs(),
            proxy_url: None,
        }
    }
}

/// Logging settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl LogConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port (defaults to 8000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address (defaults to `127.0.0.1`).
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Model catalog served by `GET /v1/models` and accepted by chat requests.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Model used when a chat request does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Model the image-generation endpoint always talks to.
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            auth: AuthConfig::default(),
            upstream: UpstreamConfig::default(),
            models: default_models(),
            default_model: default_model(),
            image_model: default_image_model(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from defaults, an optional YAML file and the
    /// environment, in increasing order of precedence.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be parsed or a value
    /// has the wrong type.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Checks cross-field invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.models.is_empty() {
            return Err(GatewayError::Config("model catalog is empty".into()));
        }
        if !self.is_known_model(&self.default_model) {
            return Err(GatewayError::Config(format!(
                "default_model '{}' is not in the model catalog",
                self.default_model
            )));
        }
        let base = self.upstream.base_url.as_str();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(GatewayError::Config(format!(
                "upstream.base_url must be an http(s) URL, got '{base}'"
            )));
        }
        Ok(())
    }

    /// Returns `true` if `model` is in the catalog.
    #[must_use]
    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}
