// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Site Registry
//!
//! JSON-file registry of site metadata, keyed by site id. The whole mapping is
//! read, mutated in memory, and rewritten on every change; the read-modify-write
//! sequence is serialized by an async mutex.
//!
//! Reads favor availability: a missing or unparsable file is an empty
//! registry, and individual malformed records are dropped. Writes are strict:
//! a failed write is returned to the caller.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::site::Site;

/// File name of the registry inside the sites directory.
pub const REGISTRY_FILE_NAME: &str = "sites.json";

/// Sites keyed by id.
pub type SiteMap = BTreeMap<String, Site>;

/// Registry write errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable site registry backed by a single JSON file.
pub struct SiteRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SiteRegistry {
    /// Create a registry stored at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full mapping.
    ///
    /// Not serialized with writers; use [`snapshot`](Self::snapshot) or
    /// [`update`](Self::update) from concurrent code.
    pub async fn load(&self) -> SiteMap {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => parse_sites(&raw, &self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SiteMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read registry, treating as empty");
                SiteMap::new()
            }
        }
    }

    /// Atomically replace the file with `sites`.
    ///
    /// Writes a sibling temp file and renames it over the target, creating the
    /// parent directory first if needed.
    pub async fn save(&self, sites: &SiteMap) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(sites)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), sites = sites.len(), "Registry saved");
        Ok(())
    }

    /// Read the full mapping, serialized with writers.
    pub async fn snapshot(&self) -> SiteMap {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Read one site, serialized with writers.
    pub async fn get(&self, id: &str) -> Option<Site> {
        self.snapshot().await.remove(id)
    }

    /// Load, mutate and save as one critical section.
    ///
    /// If `f` fails nothing is written and its error is returned.
    pub async fn update<T, E>(&self, f: impl FnOnce(&mut SiteMap) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RegistryError>,
    {
        let _guard = self.lock.lock().await;
        let mut sites = self.load().await;
        let value = f(&mut sites)?;
        self.save(&sites).await?;
        Ok(value)
    }

    /// Sibling file written before being renamed over the registry.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| REGISTRY_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Parse registry contents, dropping records that are malformed or keyed
/// under a different id.
fn parse_sites(raw: &str, path: &Path) -> SiteMap {
    let records: BTreeMap<String, serde_json::Value> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Registry file is not valid, treating as empty");
            return SiteMap::new();
        }
    };

    let mut sites = SiteMap::new();
    for (key, value) in records {
        match serde_json::from_value::<Site>(value) {
            Ok(site) if site.id == key => {
                sites.insert(key, site);
            }
            Ok(site) => {
                warn!(key = %key, id = %site.id, "Dropping registry record keyed under a different id");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping malformed registry record");
            }
        }
    }
    sites
}
