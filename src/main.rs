use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use gigagate_auth::CredentialProvider;
use gigagate_config::Config;
use gigagate_proxy::AppState;
use gigagate_types::TokenProvider;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gigagate", about = "gigagate: OpenAI-compatible gateway for GigaChat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve {
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the listening port (default: 8000).
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the listening address (default: 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
    },
    /// Fetch one token to verify the configured credentials.
    Check {
        /// Path to the YAML configuration file.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, host } => cmd_serve(config, port, host).await,
        Commands::Check { config } => cmd_check(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("failed to load config")?;
    config.validate().context("invalid config")?;
    Ok(config)
}

/// Report where the configuration came from. Runs once the subscriber built
/// from that configuration is installed.
fn log_config_source(path: Option<&Path>, config: &Config) {
    match path {
        Some(path) => tracing::debug!(path = %path.display(), "loaded configuration file"),
        None => tracing::debug!("no configuration file given, using defaults and environment"),
    }
    tracing::debug!(
        default_model = %config.default_model,
        image_model = %config.image_model,
        "configuration ready"
    );
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the shared credential source and fetch the first token.
async fn connect(config: &Config) -> Result<(reqwest::Client, Arc<CredentialProvider>)> {
    if !config.upstream.verify_tls {
        tracing::warn!("TLS certificate verification is disabled for upstream calls");
    }
    let http = gigagate_provider::build_http_client(&config.upstream)?;
    let tokens = Arc::new(CredentialProvider::new(http.clone(), &config.auth)?);
    let credential = tokens
        .refresh(0)
        .await
        .context("initial token exchange failed")?;
    tracing::info!(generation = credential.generation, "obtained upstream credential");
    Ok((http, tokens))
}

async fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(p) = port {
        config.port = p;
    }
    if let Some(h) = host {
        config.host = h;
    }
    init_tracing(&config);
    log_config_source(config_path.as_deref(), &config);

    let (http, tokens) = connect(&config).await?;
    let upstream = gigagate_provider::make_upstream(http, &config.upstream.base_url, tokens);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        models = ?config.models,
        image_model = %config.image_model,
        upstream = %config.upstream.base_url,
        "starting gateway"
    );
    let app = gigagate_proxy::make_router(AppState::new(config, upstream));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "gigagate listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("gigagate stopped");
    Ok(())
}

async fn cmd_check(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    init_tracing(&config);
    log_config_source(config_path.as_deref(), &config);
    connect(&config).await?;
    println!("credentials OK ({})", config.auth.token_url);
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}
