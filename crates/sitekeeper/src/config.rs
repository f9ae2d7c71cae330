// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for sitekeeper.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::descriptor::DescriptorImages;

/// Orchestrator backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Docker engine and compose CLI.
    Docker,
    /// In-memory driver, no containers are started.
    Mock,
}

/// Sitekeeper configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server address
    pub http_addr: SocketAddr,
    /// Base directory holding one directory per site and the registry file
    pub sites_dir: PathBuf,
    /// Host name used when building site URLs
    pub public_host: String,
    /// Lowest host port handed out to a site
    pub base_port: u16,
    /// Container engine CLI
    pub docker_bin: String,
    /// Compose command, program followed by its leading arguments
    pub compose_cmd: Vec<String>,
    /// Images used for the generated descriptor
    pub images: DescriptorImages,
    /// Timeout for bringing a site up or tearing it down
    pub provision_timeout: Duration,
    /// Timeout for per-container operations and enumeration
    pub container_timeout: Duration,
    /// Orchestrator backend
    pub driver: DriverKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = std::env::var("SITEKEEPER_HTTP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort("SITEKEEPER_HTTP_PORT"))?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let sites_dir = PathBuf::from(
            std::env::var("SITEKEEPER_SITES_DIR").unwrap_or_else(|_| "sites".to_string()),
        );

        let public_host =
            std::env::var("SITEKEEPER_PUBLIC_HOST").unwrap_or_else(|_| "localhost".to_string());

        let base_port: u16 = std::env::var("SITEKEEPER_BASE_PORT")
            .unwrap_or_else(|_| crate::ports::DEFAULT_BASE_PORT.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort("SITEKEEPER_BASE_PORT"))?;

        let docker_bin =
            std::env::var("SITEKEEPER_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string());

        let compose_cmd = parse_command(
            &std::env::var("SITEKEEPER_COMPOSE_CMD")
                .unwrap_or_else(|_| "docker compose".to_string()),
        )
        .ok_or(ConfigError::EmptyCommand("SITEKEEPER_COMPOSE_CMD"))?;

        let defaults = DescriptorImages::default();
        let images = DescriptorImages {
            db: std::env::var("SITEKEEPER_DB_IMAGE").unwrap_or(defaults.db),
            app: std::env::var("SITEKEEPER_APP_IMAGE").unwrap_or(defaults.app),
        };

        let provision_timeout = parse_secs("SITEKEEPER_PROVISION_TIMEOUT_SECS", 300)?;
        let container_timeout = parse_secs("SITEKEEPER_CONTAINER_TIMEOUT_SECS", 60)?;

        let driver = match std::env::var("SITEKEEPER_DRIVER")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "docker" => DriverKind::Docker,
            "mock" => DriverKind::Mock,
            other => return Err(ConfigError::UnknownDriver(other.to_string())),
        };

        Ok(Self {
            http_addr,
            sites_dir,
            public_host,
            base_port,
            docker_bin,
            compose_cmd,
            images,
            provision_timeout,
            container_timeout,
            driver,
        })
    }

    /// Path of the registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.sites_dir.join(crate::registry::REGISTRY_FILE_NAME)
    }
}

/// Split a command line on whitespace. `None` if nothing is left.
fn parse_command(raw: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() { None } else { Some(parts) }
}

fn parse_secs(var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidTimeout(var)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The port number is invalid.
    #[error("Invalid port number in {0}")]
    InvalidPort(&'static str),
    /// A timeout is not a positive number of seconds.
    #[error("Invalid timeout in {0}: expected a positive number of seconds")]
    InvalidTimeout(&'static str),
    /// A command variable is set but empty.
    #[error("Empty command in {0}")]
    EmptyCommand(&'static str),
    /// The driver name is not recognised.
    #[error("Unknown driver '{0}', expected 'docker' or 'mock'")]
    UnknownDriver(String),
}
