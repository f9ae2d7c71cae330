// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sitekeeper - Site Lifecycle Management Server
//!
//! An HTTP server responsible for:
//! - Site provisioning (descriptor generation, port allocation, compose up)
//! - Site lifecycle (start, stop, delete with volume teardown)
//! - Site registry (durable metadata in `sites.json`)

use std::sync::Arc;
use tracing::{info, warn};

use sitekeeper::config::{Config, DriverKind};
use sitekeeper::driver::{DockerCliConfig, DockerCliDriver, MockDriver, OrchestratorDriver};
use sitekeeper::manager::{LifecycleManager, ManagerConfig};
use sitekeeper::registry::SiteRegistry;
use sitekeeper::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitekeeper=info,tower_http=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        sites_dir = %config.sites_dir.display(),
        public_host = %config.public_host,
        base_port = config.base_port,
        "Starting Sitekeeper"
    );

    let driver: Arc<dyn OrchestratorDriver> = match config.driver {
        DriverKind::Docker => Arc::new(DockerCliDriver::new(DockerCliConfig::from(&config))),
        DriverKind::Mock => {
            warn!("Using in-memory mock driver, no containers will be started");
            Arc::new(MockDriver::new())
        }
    };
    info!(driver_type = driver.driver_type(), "Driver initialized");

    let registry = SiteRegistry::new(config.registry_path());
    let manager = Arc::new(LifecycleManager::new(
        driver,
        registry,
        ManagerConfig::from(&config),
    ));

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "Sitekeeper ready");

    axum::serve(listener, server::router(manager))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    info!("Sitekeeper shut down");

    Ok(())
}
