//! Metronome - gno.land chain metrics collector.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! metronome
//!
//! # Start with environment overrides
//! INDEXER_URL=http://indexer:8546/graphql/query METRICS_PORT=9091 metronome
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use tracing_subscriber::{fmt, EnvFilter};

use metronome_core::error::CollectorError;
use metronome_core::metrics::{init_metrics, PrometheusSink};
use metronome_core::services::{CollectorConfig, CollectorService};
use metronome_graphql::{GnoClientConfig, GnoIndexerClient};

/// Metronome CLI - gno.land chain metrics collector.
#[derive(Parser, Debug)]
#[command(name = "metronome")]
#[command(about = "Metronome - gno.land chain metrics collector")]
#[command(version)]
struct Cli {
    /// gno.land tx indexer GraphQL endpoint.
    #[arg(
        long,
        env = "INDEXER_URL",
        default_value = "http://localhost:8546/graphql/query"
    )]
    indexer_url: String,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "8080")]
    metrics_port: u16,

    /// Interval between block polls (e.g. "5s", "500ms").
    #[arg(
        long,
        env = "PROCESSING_INTERVAL",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    processing_interval: Duration,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Metronome");
    debug!(indexer_url = %cli.indexer_url, "Upstream endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 📊 METRICS EXPORTER
    // ─────────────────────────────────────────────────────────────────────────
    // The scrape surface is the whole point of the process, so failing
    // to bind it is fatal.
    let metrics_addr: std::net::SocketAddr = format!("0.0.0.0:{}", cli.metrics_port)
        .parse()
        .context("Invalid metrics address")?;

    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("Failed to start metrics exporter")?;
    init_metrics();

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 UPSTREAM CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    let client = GnoIndexerClient::new(GnoClientConfig {
        endpoint: cli.indexer_url.clone(),
        ..Default::default()
    })
    .context("Failed to build indexer client")?;

    let collector_config = CollectorConfig {
        poll_interval: cli.processing_interval,
    };

    let mut collector =
        CollectorService::new(collector_config, Arc::new(client), Arc::new(PrometheusSink));

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut collector_handle = tokio::spawn(
        async move { collector.run(shutdown_rx).await }.instrument(info_span!("collector")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Metronome ready");
    info!("   📊 Metrics:  http://localhost:{}/metrics", cli.metrics_port);
    info!("   Press Ctrl+C to stop");

    tokio::select! {
        _ = shutdown_signal() => {
            // ─────────────────────────────────────────────────────────
            // 🛑 SHUTDOWN
            // ─────────────────────────────────────────────────────────
            info!("🛑 Shutting down...");
            let _ = shutdown_tx.send(true);

            match tokio::time::timeout(Duration::from_secs(10), collector_handle).await {
                Ok(_) => debug!("Collector stopped"),
                Err(_) => warn!("⚠️  Collector shutdown timed out"),
            }
        }
        result = &mut collector_handle => {
            match result {
                Ok(Ok(())) | Ok(Err(CollectorError::ShutdownRequested)) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "❌ Collector failed");
                    return Err(e.into());
                }
                Err(e) => {
                    return Err(anyhow::Error::from(e)).context("Collector task panicked");
                }
            }
        }
    }

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
