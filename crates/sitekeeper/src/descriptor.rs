// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment descriptor generation.
//!
//! Every site is described by a two-service compose file (`db` + `app`)
//! written to `<sites_dir>/<sanitized_name>/docker-compose.yml`. The file is
//! written before the orchestrator is invoked so that teardown can later find
//! the exact same descriptor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// File name of the descriptor inside a site directory.
pub const DESCRIPTOR_FILE_NAME: &str = "docker-compose.yml";

/// Database service name.
pub const DB_SERVICE: &str = "db";

/// Application service name.
pub const APP_SERVICE: &str = "app";

/// Port the application listens on inside its container.
pub const APP_CONTAINER_PORT: u16 = 80;

/// Label marking application containers managed by sitekeeper.
pub const MANAGED_LABEL: &str = "sitekeeper.managed";

/// Database user the application connects as.
pub const APP_DB_USER: &str = "app";

const RESTART_POLICY: &str = "always";

/// Errors reading or writing descriptors.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Images used for the two services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorImages {
    /// Relational database image.
    pub db: String,
    /// Application server image.
    pub app: String,
}

impl Default for DescriptorImages {
    fn default() -> Self {
        Self {
            db: "mariadb:10.6".to_string(),
            app: "wordpress:latest".to_string(),
        }
    }
}

/// A compose file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Services keyed by name.
    pub services: BTreeMap<String, ServiceSpec>,
}

/// One compose service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Image reference.
    pub image: String,
    /// Restart policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Port mappings, `host:container`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Volume mounts, `source:target`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Services started before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Container labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ComposeFile {
    /// Host port mapped to the application's container port.
    pub fn app_port(&self) -> Option<u16> {
        self.services
            .get(APP_SERVICE)?
            .ports
            .iter()
            .filter_map(|mapping| parse_port_mapping(mapping))
            .find(|(_, container)| *container == APP_CONTAINER_PORT)
            .map(|(host, _)| host)
    }
}

/// Parse a `host:container` port mapping. An optional `/proto` suffix is ignored.
pub fn parse_port_mapping(mapping: &str) -> Option<(u16, u16)> {
    let mapping = mapping.split('/').next()?;
    let (host, container) = mapping.rsplit_once(':')?;
    // `ip:host:container` keeps the host port as the last segment before the container port
    let host = host.rsplit(':').next()?;
    Some((host.parse().ok()?, container.parse().ok()?))
}

/// Build the descriptor for a site.
pub fn build_descriptor(
    images: &DescriptorImages,
    sanitized_name: &str,
    db_password: &str,
    port: u16,
) -> ComposeFile {
    let db_name = format!("{sanitized_name}_db");

    let db = ServiceSpec {
        image: images.db.clone(),
        restart: Some(RESTART_POLICY.to_string()),
        environment: BTreeMap::from([
            ("MYSQL_ROOT_PASSWORD".to_string(), db_password.to_string()),
            ("MYSQL_DATABASE".to_string(), db_name.clone()),
            ("MYSQL_USER".to_string(), APP_DB_USER.to_string()),
            ("MYSQL_PASSWORD".to_string(), db_password.to_string()),
        ]),
        ports: Vec::new(),
        volumes: vec![format!("./db_data/{sanitized_name}:/var/lib/mysql")],
        depends_on: Vec::new(),
        labels: BTreeMap::new(),
    };

    let app = ServiceSpec {
        image: images.app.clone(),
        restart: Some(RESTART_POLICY.to_string()),
        environment: BTreeMap::from([
            ("WORDPRESS_DB_HOST".to_string(), DB_SERVICE.to_string()),
            ("WORDPRESS_DB_USER".to_string(), APP_DB_USER.to_string()),
            ("WORDPRESS_DB_PASSWORD".to_string(), db_password.to_string()),
            ("WORDPRESS_DB_NAME".to_string(), db_name),
        ]),
        ports: vec![format!("{port}:{APP_CONTAINER_PORT}")],
        volumes: vec![format!("./app_data/{sanitized_name}:/var/www/html")],
        depends_on: vec![DB_SERVICE.to_string()],
        labels: BTreeMap::from([(MANAGED_LABEL.to_string(), "true".to_string())]),
    };

    ComposeFile {
        services: BTreeMap::from([(DB_SERVICE.to_string(), db), (APP_SERVICE.to_string(), app)]),
    }
}

/// Path of the descriptor inside a site directory.
pub fn descriptor_path(site_dir: &Path) -> PathBuf {
    site_dir.join(DESCRIPTOR_FILE_NAME)
}

/// Write a descriptor into `site_dir`, returning its path.
pub async fn write_descriptor(
    site_dir: &Path,
    descriptor: &ComposeFile,
) -> Result<PathBuf, DescriptorError> {
    let path = descriptor_path(site_dir);
    let yaml = serde_yaml::to_string(descriptor)?;
    fs::write(&path, yaml).await?;
    Ok(path)
}

/// Read a descriptor back from disk.
pub async fn read_descriptor(path: &Path) -> Result<ComposeFile, DescriptorError> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_yaml::from_str(&raw)?)
}
