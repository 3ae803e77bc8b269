//! entra-exporter — Prometheus exporter for Microsoft Entra ID.
//!
//! Assembles the exporter:
//! - Configuration (TOML)
//! - Token provider + Graph connector
//! - Client factory (one cached client per tenant)
//! - One background poller per enabled collector
//! - HTTP server (`/metrics`, `/health`, `/`)
//!
//! # Usage
//!
//! ```text
//! entra-exporter --config config.toml --listen-address 0.0.0.0:8080
//! ```

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use entra_collector::{ClientFactory, Exporter};
use entra_config::{ExporterConfig, resolve_tenants};
use entra_graph::azure::{CLIENT_ID_ENV, CLIENT_SECRET_ENV};
use entra_graph::{AzureIdentityProvider, EnvTokenProvider, GraphConnector, IdentityProvider};

/// Upper bound on draining in-flight work after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const TENANT_ENV: &str = "AZURE_TENANT_ID";

#[derive(Parser)]
#[command(name = "entra-exporter", about = "Prometheus exporter for Microsoft Entra ID")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Address to serve metrics on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen_address: SocketAddr,

    /// Log level, used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Force debug logging (also mounts `/debug/env`).
    #[arg(long, env = "LOG_DEBUG")]
    log_debug: bool,

    /// Append log output to this file instead of stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// `--log-debug` overrides `--log-level`.
    fn effective_log_level(&self) -> &str {
        if self.log_debug { "debug" } else { self.log_level.as_str() }
    }
}

fn log_writer(log_file: Option<&Path>) -> anyhow::Result<BoxMakeWriter> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Ok(BoxMakeWriter::new(Arc::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stdout)),
    }
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.log_debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.effective_log_level()))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(cli.log_file.is_none())
        .with_writer(log_writer(cli.log_file.as_deref())?);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    run(cli).await
}

/// Pick the token source: an externally supplied token if configured,
/// otherwise the Azure identity SDK.
fn identity_provider() -> Arc<dyn IdentityProvider> {
    let token = EnvTokenProvider::from_env();
    if token.is_configured() {
        info!("using externally supplied access token");
        return Arc::new(token);
    }

    let client_id = std::env::var(CLIENT_ID_ENV).ok().filter(|v| !v.is_empty());
    let client_secret = std::env::var(CLIENT_SECRET_ENV).ok().filter(|v| !v.is_empty());
    match (&client_id, &client_secret) {
        (None, _) => warn!("{CLIENT_ID_ENV} is not set; authentication may fail if not using managed identity"),
        (Some(_), None) => warn!("{CLIENT_SECRET_ENV} is not set but {CLIENT_ID_ENV} is; authentication may fail"),
        (Some(_), Some(_)) => {}
    }
    info!("using azure identity credentials");
    Arc::new(AzureIdentityProvider::new(client_id, client_secret))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Entra ID exporter starting");

    let config = ExporterConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    // ── Identity ───────────────────────────────────────────────

    let ambient_tenant = std::env::var(TENANT_ENV).ok().filter(|t| !t.is_empty());
    if ambient_tenant.is_none() {
        warn!("{TENANT_ENV} is not set; tenants without an ID use the token source's default tenant");
    }

    let identity = identity_provider();

    let connector = GraphConnector::new(config.graph_endpoint(), config.request_timeout()?)?;
    info!(endpoint = config.graph_endpoint(), "graph connector initialized");

    let factory = Arc::new(
        ClientFactory::new(identity, Arc::new(connector))
            .with_ambient_tenant(ambient_tenant.clone()),
    );

    // ── Collectors ─────────────────────────────────────────────

    let tenants = resolve_tenants(&config, ambient_tenant.as_deref());
    info!(tenants = tenants.len(), "tenants resolved");

    let exporter = Arc::new(Exporter::new(&config.collectors, tenants, factory)?);
    if exporter.pollers().is_empty() {
        warn!("all collectors are disabled; only scrape bookkeeping will be served");
    } else {
        info!(domains = ?exporter.enabled_domains(), "collectors enabled");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handles = exporter.start(&shutdown_rx);

    // ── HTTP server ────────────────────────────────────────────

    let debug_env = LevelFilter::current() >= LevelFilter::DEBUG;
    let router = entra_api::build_router(Arc::clone(&exporter), debug_env);

    let listener = tokio::net::TcpListener::bind(cli.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen_address))?;
    info!(addr = %cli.listen_address, debug_env, "metrics server listening");

    let mut server_shutdown = shutdown_rx.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            let _ = shutdown_tx.send(true);
            result.context("server task failed")??;
            anyhow::bail!("server stopped unexpectedly");
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    // ── Drain ──────────────────────────────────────────────────

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    match tokio::time::timeout_at(deadline, &mut server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task failed during shutdown"),
        Err(_) => {
            warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "server drain timed out");
            server.abort();
        }
    }

    for handle in poller_handles {
        if tokio::time::timeout_at(deadline, handle).await.is_err() {
            warn!("collector still running at shutdown deadline");
        }
    }

    info!("Entra ID exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["entra-exporter"]);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.listen_address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.log_format, LogFormat::Text));
        assert!(!cli.log_debug);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "entra-exporter",
            "--config",
            "/etc/entra/config.toml",
            "--listen-address",
            "127.0.0.1:9090",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.config, PathBuf::from("/etc/entra/config.toml"));
        assert_eq!(cli.listen_address.port(), 9090);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[test]
    fn log_debug_forces_debug_level() {
        let cli = Cli::parse_from(["entra-exporter", "--log-level", "warn", "--log-debug"]);
        assert_eq!(cli.effective_log_level(), "debug");

        let cli = Cli::parse_from(["entra-exporter", "--log-level", "warn"]);
        assert_eq!(cli.effective_log_level(), "warn");
    }

    #[test]
    fn log_file_is_appended() {
        use std::io::Write;
        use tracing_subscriber::fmt::MakeWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.log");
        std::fs::write(&path, "existing\n").unwrap();

        let writer = log_writer(Some(&path)).unwrap();
        writer.make_writer().write_all(b"appended\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nappended\n");
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        assert!(log_writer(Some(Path::new("/nonexistent/dir/exporter.log"))).is_err());
    }

    #[test]
    fn invalid_listen_address_is_rejected() {
        assert!(Cli::try_parse_from(["entra-exporter", "--listen-address", "nowhere"]).is_err());
    }
}
