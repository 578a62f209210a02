// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AnyCall — capture any API call and inspect it live
//
//  serve:  axum on tokio, in-memory append-only request log
//  watch:  terminal monitor polling the query endpoint
//  Config: YAML file + ANYCALL_* env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anycall_api::AppState;
use anycall_core::config::AnyCallConfig;
use anycall_monitor::{LogClient, LogSource, LogView, Poller, terminal};
use anycall_observability::MetricsCollector;
use anycall_store::LogStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "anycall", version, about = "AnyCall — capture any API call and inspect it live")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "anycall.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record calls and serve the log (default)
    Serve {
        /// Listen address, overrides `server.addr`
        #[arg(long)]
        addr: Option<String>,
    },
    /// Poll a running instance and show its log in the terminal
    Watch {
        /// Query endpoint URL, overrides `monitor.endpoint`
        #[arg(long)]
        endpoint: Option<String>,

        /// Seconds between polls, overrides `monitor.refresh_interval_secs`
        #[arg(long)]
        interval: Option<u64>,

        /// Fetch once, print the table and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    // stderr, so the watch table on stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // ── Config ──
    if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
    } else {
        info!(path = %cli.config.display(), "No config file found, using defaults");
    }
    let mut config = AnyCallConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            serve(config).await
        }
        Command::Watch {
            endpoint,
            interval,
            once,
        } => {
            if let Some(endpoint) = endpoint {
                config.monitor.endpoint = endpoint;
            }
            if let Some(secs) = interval {
                config.monitor.refresh_interval_secs = secs.max(1);
            }
            watch(config, once).await
        }
    }
}

async fn serve(config: AnyCallConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "AnyCall starting");

    // ── Log store: one per process, shared by every handler ──
    let store = LogStore::new();

    let metrics = Arc::new(MetricsCollector::new(config.metrics.enabled)?);
    if metrics.is_enabled() {
        info!(path = %config.metrics.path, "Prometheus metrics enabled");
    }

    let state = Arc::new(AppState::new(&config, store, metrics));
    anycall_api::serve(&config.server.addr, state, shutdown_signal()).await?;

    info!("AnyCall stopped");
    Ok(())
}

async fn watch(config: AnyCallConfig, once: bool) -> anyhow::Result<()> {
    let client = LogClient::new(
        config.monitor.endpoint.clone(),
        Duration::from_millis(config.monitor.timeout_ms),
    )?;

    if once {
        let entries = client.fetch().await?;
        print!("{}", LogView::new(entries).render_table());
        return Ok(());
    }

    info!(
        endpoint = %client.endpoint(),
        interval_secs = config.monitor.refresh_interval_secs,
        "Watching request log"
    );
    let handle = Poller::new(
        client,
        Duration::from_secs(config.monitor.refresh_interval_secs),
    )
    .spawn();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    terminal::run(handle, stdin, &mut stdout).await?;
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM (docker stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping...");
}
