//! Hydrate Router
//!
//! Serves client hydration bundles compiled on first request.
//!
//! ```text
//!     Client Request
//!     ──────────▶ http server ──▶ routing dispatcher ──▶ client route ──▶ bundle cache
//!                  (id, trace,      (METHOD@/path,          (generated      │ miss
//!                   timeout,         first match wins,       JSX source)    ▼
//!                   limit)           404 / 405 / 500)                   build gate ──▶ esbuild
//!     Client Response                                                             (native or
//!     ◀────────── application/javascript ◀──────────────────────────────────────  remote service)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use hydrate_router::config::{load_config, HydrateConfig};
use hydrate_router::lifecycle::{build_app, Shutdown};
use hydrate_router::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "hydrate-router")]
#[command(about = "Route dispatcher serving on-demand hydration bundles", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => HydrateConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;

    tracing::info!("hydrate-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_in_flight = config.listener.max_in_flight,
        request_timeout_secs = config.timeouts.request_secs,
        client_routes = config.client_routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let app = build_app(config)?;

    let shutdown = Shutdown::new();
    app.into_server().run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
