//! Route resolver service.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────────┐
//!                  │                  ROUTE RESOLVER                    │
//!                  │                                                    │
//!   HTTP request   │  ┌─────────┐   ┌──────────────┐   ┌─────────────┐  │
//!   ───────────────┼─▶│  http   │──▶│  resolution  │──▶│   routing   │  │
//!                  │  │ server  │   │   pipeline   │   │  rule set   │  │
//!                  │  └────┬────┘   └──────┬───────┘   └─────────────┘  │
//!                  │       │               │                            │
//!   JSON route     │       │               ▼                            │
//!   ◀──────────────┼───────┘        ┌─────────────┐                     │
//!                  │                │    store    │ tokens, content,    │
//!                  │                │             │ configured rules    │
//!                  │                └─────────────┘                     │
//!                  │                                                    │
//!                  │  config + watcher │ admin API │ observability      │
//!                  └────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use route_resolver::admin::setup_admin_router;
use route_resolver::config::{load_config, ResolverConfig};
use route_resolver::config::watcher::ConfigWatcher;
use route_resolver::http::HttpServer;
use route_resolver::lifecycle::shutdown::wait_for;
use route_resolver::lifecycle::signals::spawn_signal_listener;
use route_resolver::lifecycle::Shutdown;
use route_resolver::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-resolver", version)]
#[command(about = "Resolves request paths to handler routes", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ResolverConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("route-resolver v{} starting", env!("CARGO_PKG_VERSION"));

    let server = HttpServer::new(config.clone()).await?;

    if args.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        site_rules = config.rules.len(),
        cp_rules = config.cp_rules.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());

    // Keep the watcher handle alive for the lifetime of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    if config.admin.enabled {
        let admin = setup_admin_router(server.state());
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(wait_for(admin_shutdown))
                .await
            {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
