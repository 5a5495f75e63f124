//! Configuration loading for the gigagate gateway.
//!
//! Uses figment to layer built-in defaults, an optional YAML file and
//! `GIGAGATE_`-prefixed environment variables. Configuration is read once at
//! startup.

pub mod schema;

pub use schema::{AuthConfig, Config, LogConfig, UpstreamConfig};
