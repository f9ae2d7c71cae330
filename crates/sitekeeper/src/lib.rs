// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sitekeeper - Site Lifecycle Management
//!
//! This crate provisions, tracks and tears down isolated sites on a single
//! host. A site is a database container plus an application container, with
//! its own generated credentials, host port, volumes and compose descriptor.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          HTTP clients (UI, curl)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        sitekeeper (This Crate)                           │
//! │                             Port 5000                                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐     │
//! │  │    Name     │  │    Port     │  │ Descriptor  │  │    Site     │     │
//! │  │  Sanitizer  │  │  Allocator  │  │   Builder   │  │  Registry   │     │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └─────────────┘     │
//! │                  ▲  Lifecycle Manager (create/start/stop/delete)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                  │                                   │
//!                  │ compose up/down, start/stop       │ sites.json
//!                  ▼                                   ▼
//!        ┌───────────────────┐             ┌───────────────────────┐
//!        │  Docker engine    │             │  <sites_dir>/<name>/  │
//!        │  (db + app)       │             │  docker-compose.yml   │
//!        └───────────────────┘             └───────────────────────┘
//! ```
//!
//! # HTTP API
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /api/sites` | List sites with their last known status |
//! | `POST /api/sites` | Create a site from `{name, description}` |
//! | `GET /api/sites/{id}` | Get one site |
//! | `DELETE /api/sites/{id}` | Delete a stopped site and its volumes |
//! | `POST /api/sites/{id}/stop` | Stop a site |
//! | `POST /api/sites/{id}/start` | Start a site |
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SITEKEEPER_HTTP_PORT` | `5000` | HTTP server port |
//! | `SITEKEEPER_SITES_DIR` | `sites` | Site directories and `sites.json` |
//! | `SITEKEEPER_PUBLIC_HOST` | `localhost` | Host used in site URLs |
//! | `SITEKEEPER_BASE_PORT` | `8000` | Lowest host port handed out |
//! | `SITEKEEPER_DOCKER_BIN` | `docker` | Container engine CLI |
//! | `SITEKEEPER_COMPOSE_CMD` | `docker compose` | Compose command |
//! | `SITEKEEPER_DB_IMAGE` | `mariadb:10.6` | Database image |
//! | `SITEKEEPER_APP_IMAGE` | `wordpress:latest` | Application image |
//! | `SITEKEEPER_PROVISION_TIMEOUT_SECS` | `300` | Compose up/down timeout |
//! | `SITEKEEPER_CONTAINER_TIMEOUT_SECS` | `60` | Per-container command timeout |
//! | `SITEKEEPER_DRIVER` | `docker` | `docker` or `mock` |
//!
//! # Modules
//!
//! - [`config`]: Server configuration from environment variables
//! - [`credentials`]: Database password generation
//! - [`descriptor`]: Compose descriptor generation
//! - [`driver`]: Orchestrator backends (Docker CLI, mock)
//! - [`error`]: Error types
//! - [`manager`]: Site lifecycle manager
//! - [`ports`]: Host port allocation
//! - [`registry`]: Durable site registry
//! - [`sanitize`]: Display name sanitization
//! - [`server`]: HTTP API
//! - [`site`]: Site records

#![deny(missing_docs)]

/// Server configuration loaded from environment variables.
pub mod config;

/// Database password generation.
pub mod credentials;

/// Compose descriptor generation.
pub mod descriptor;

/// Orchestrator backends.
pub mod driver;

/// Error types for sitekeeper operations.
pub mod error;

/// Site lifecycle manager.
pub mod manager;

/// Host port allocation.
pub mod ports;

/// JSON-file site registry.
pub mod registry;

/// Display name sanitization.
pub mod sanitize;

/// HTTP API server.
pub mod server;

/// Site records and status.
pub mod site;

pub use config::Config;
pub use error::Error;
pub use manager::{LifecycleManager, ManagerConfig};
