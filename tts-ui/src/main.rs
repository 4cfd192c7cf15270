//! tts-ui - Text to Speech user interface service
//!
//! Serves the sign-in gated conversion form on a local port, talks to the
//! hosted identity provider for the session, and to the remote conversion
//! service for audio.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tts_common::config::ConfigResolver;
use tts_ui::client::ConversionClient;
use tts_ui::session::{HostedIdentityProvider, SessionProvider};
use tts_ui::{build_router, AppState};

/// Identity provider calls are small; don't let a slow provider stall sign-in forever
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(15);

/// Command-line arguments for tts-ui
#[derive(Parser, Debug)]
#[command(name = "tts-ui")]
#[command(about = "Text to Speech user interface")]
#[command(version)]
struct Args {
    /// Config file (default: TTS_CONFIG, then the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "TTS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TTS_PORT")]
    port: Option<u16>,

    /// Conversion service endpoint
    #[arg(long, env = "TTS_CONVERT_ENDPOINT")]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_source) = ConfigResolver::new("tts-ui")
        .with_cli_path(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tts_ui={level},tts_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any network delays
    info!(
        "Starting Text to Speech UI (tts-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("Configuration: compiled defaults (no config file found)"),
    }

    // Command-line / environment overrides
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(endpoint) = args.endpoint {
        config.conversion.endpoint = endpoint;
    }
    config.validate().context("Invalid configuration")?;

    info!("Conversion endpoint: {}", config.conversion.endpoint);

    let identity = Arc::new(
        HostedIdentityProvider::new(config.identity.clone(), IDENTITY_TIMEOUT)
            .context("Failed to create identity provider client")?,
    );
    let session = Arc::new(SessionProvider::new(identity));

    // Session stays Loading until discovery finishes
    let bootstrap = session.clone();
    tokio::spawn(async move {
        bootstrap.bootstrap().await;
    });

    let converter = Arc::new(
        ConversionClient::new(
            &config.conversion.endpoint,
            Duration::from_secs(config.conversion.timeout_secs),
        )
        .context("Failed to create conversion client")?,
    );

    let app = build_router(AppState::new(session, converter));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("tts-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
