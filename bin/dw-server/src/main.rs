//! Dashwatch Server
//!
//! Serves the dashboard API under `/dashboard/v1`:
//! - registrations: dashboard configurations, announced to webhooks on change
//! - dashboards: rendered views of a registration
//! - notifications: webhook subscriptions
//! - status: upstream and storage diagnostics
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DW_CONFIG` | - | Path to a TOML config file |
//! | `DW_HOST` | `0.0.0.0` | Bind address |
//! | `DW_PORT` | `8080` | HTTP port |
//! | `DW_STORAGE_BACKEND` | `memory` | `memory`, `file` or `mongo` |
//! | `DW_DATA_DIR` | `./data` | Directory for the file backend |
//! | `DW_MONGO_URL` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `DW_MONGO_DB` | `dashwatch` | MongoDB database name |
//! | `DW_LOG_JSON` | `false` | Emit JSON log lines |
//! | `RUST_LOG` | `info` | Log level |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{extract::Request, ServiceExt};
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use dw_common::{logging::init_logging, ReservedIds};
use dw_config::AppConfig;
use dw_notify::{DispatcherConfig, HttpDeliverer, HttpDelivererConfig};
use dw_platform::api;
use dw_platform::{HttpAggregator, Platform, Stores};

#[derive(Parser, Debug)]
#[command(name = "dw-server", about = "Dashwatch dashboard and webhook server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DW_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    init_logging(config.logging.json);
    info!(version = dw_common::VERSION, "Starting Dashwatch Server");

    let stores = Stores::open(&config.storage).await?;

    let deliverer = HttpDeliverer::new(HttpDelivererConfig {
        connect_timeout: config.dispatch.connect_timeout(),
        request_timeout: config.dispatch.delivery_timeout(),
    })?;
    let aggregator = HttpAggregator::new(config.upstream.clone(), config.dispatch.delivery_timeout())?;

    let platform = Platform::new(
        stores,
        ReservedIds::new(config.policy.reserved_subscription_ids.iter().cloned()),
        Arc::new(deliverer),
        Arc::new(aggregator),
        DispatcherConfig {
            delivery_timeout: config.dispatch.delivery_timeout(),
            max_concurrency: config.dispatch.max_concurrency,
        },
    );

    let router = api::router(&platform)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    let app = api::with_normalized_paths(router);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashwatch Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
