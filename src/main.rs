//! shutdown-tree demo server
//!
//! Serves a tiny HTTP app and tears it down through the dependency tree:
//!
//! ```text
//!   SIGINT/SIGTERM
//!        │
//!        ▼
//!   http_server ──▶ request_log
//!   (stop accepting,  (report served
//!    drain requests)   request count)
//! ```
//!
//! A second SIGINT/SIGTERM while draining aborts with a non-zero exit code.

use axum::{extract::State, routing::get, Router};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use shutdown_tree::config::validation::validate_config;
use shutdown_tree::config::watcher::TimeoutWatcher;
use shutdown_tree::config::{load_config, ConfigError, ShutdownConfig};
use shutdown_tree::observability::init_logging;
use shutdown_tree::{GracefulShutdown, ShutdownError};

#[derive(Parser)]
#[command(name = "shutdown-tree")]
#[command(about = "Demo server with dependency-ordered graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file (watched for timeout changes).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the shutdown timeout, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Override the bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShutdownConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(bind) = cli.bind {
        config.demo.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.logging)?;

    tracing::info!("shutdown-tree v0.1.0 starting");
    tracing::info!(
        timeout_ms = config.timeout_ms,
        bind_address = %config.demo.bind_address,
        "Configuration loaded"
    );

    let shutdown = GracefulShutdown::from_config(&config);
    shutdown.listen()?;

    // Dropping the watcher stops it, so hold it until exit.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = TimeoutWatcher::new(path, shutdown.timeout());
            let watcher = watcher.run()?;
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                while let Some(timeout) = updates.recv().await {
                    shutdown.set_timeout(timeout);
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let listener = TcpListener::bind(&config.demo.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let served = Arc::new(AtomicU64::new(0));
    let app = Router::new()
        .route("/", get(hello))
        .with_state(served.clone());

    let stop = Arc::new(Notify::new());
    let (stopped_tx, stopped_rx) = watch::channel(false);

    let server_stop = stop.clone();
    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_stop.notified().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "HTTP server failed");
        }
        stopped_tx.send_replace(true);
    });

    shutdown.register("http_server", move |ctx| {
        let stop = stop.clone();
        let mut stopped = stopped_rx.clone();
        async move {
            stop.notify_one();
            tokio::select! {
                _ = stopped.wait_for(|done| *done) => {
                    tracing::info!("Gracefully shut down HTTP server");
                }
                () = ctx.cancelled() => {
                    tracing::warn!("HTTP server still draining at shutdown deadline");
                }
            }
        }
    })?;

    shutdown.register_dependent("http_server", "request_log", move |_| {
        let served = served.clone();
        async move {
            tracing::info!(
                requests = served.load(Ordering::Relaxed),
                "Requests served before shutdown"
            );
        }
    })?;

    match shutdown.wait().await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Err(ShutdownError::ForceStop) => {
            tracing::error!("Shutdown force stopped, exiting immediately");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn hello(State(served): State<Arc<AtomicU64>>) -> &'static str {
    served.fetch_add(1, Ordering::Relaxed);
    "hello\n"
}
