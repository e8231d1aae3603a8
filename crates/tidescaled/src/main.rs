//! tidescaled — the tidescale daemon.
//!
//! Single binary that assembles the tidescale subsystems:
//! - State store (redb)
//! - Schedule controller (resync, change notifications, retries)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! tidescaled standalone --config /etc/tidescale/tidescale.toml --port 8443
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tidescale_core::config::LogConfig;
use tidescale_core::TideConfig;
use tidescale_reconcile::{Controller, trigger_channel};
use tidescale_state::StateStore;

#[derive(Parser)]
#[command(name = "tidescaled", about = "tidescale daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller and API in one process.
    Standalone {
        /// Path to tidescale.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state (overrides `store.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Resync interval, e.g. "30s" (overrides `controller.resync_interval`).
        #[arg(long)]
        resync_interval: Option<String>,

        /// Emit JSON logs (overrides `log.json`).
        #[arg(long)]
        log_json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            config,
            port,
            data_dir,
            resync_interval,
            log_json,
        } => {
            let mut config = match config {
                Some(path) => TideConfig::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => TideConfig::default(),
            };
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.store.data_dir = data_dir;
            }
            if let Some(resync_interval) = resync_interval {
                config.controller.resync_interval = resync_interval;
            }
            config.log.json |= log_json;

            init_tracing(&config.log);
            run_standalone(config).await
        }
    }
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_standalone(config: TideConfig) -> anyhow::Result<()> {
    info!("tidescale daemon starting in standalone mode");

    let timings = config
        .controller
        .timings()
        .context("invalid controller timings")?;

    // Ensure data directory exists.
    std::fs::create_dir_all(&config.store.data_dir)
        .with_context(|| format!("creating {}", config.store.data_dir.display()))?;
    let db_path = config.store.data_dir.join("tidescale.redb");

    // ── Initialize subsystems ──────────────────────────────────

    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let (triggers, trigger_rx) = trigger_channel();
    let controller = Controller::new(store.clone(), timings);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let controller_handle = tokio::spawn(controller.run(trigger_rx, shutdown_rx));

    // ── Start API server ───────────────────────────────────────

    let router = tidescale_api::build_router(store, triggers);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for the controller to finish its current pass.
    let _ = controller_handle.await;

    info!("tidescale daemon stopped");
    Ok(())
}
