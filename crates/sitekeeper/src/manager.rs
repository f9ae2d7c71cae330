// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Site lifecycle manager.
//!
//! Owns the consistency contract between the [`SiteRegistry`] and the
//! orchestrator. It is the only writer of the registry.
//!
//! # State machine
//!
//! ```text
//!   absent ──create──▶ created ──start──▶ running ──stop──▶ stopped
//!                         │                  ▲                 │
//!                         │                  └──────start──────┤
//!                         └──delete──▶ absent ◀─────delete─────┘
//! ```
//!
//! Delete is refused while the application container is running.
//!
//! # Concurrency
//!
//! Every mutating operation holds the lifecycle lock for its whole duration.
//! For create, port allocation, descriptor write, apply and the registry
//! insert form one critical section, so concurrent creates never observe the
//! same free port. Start and stop cannot slip in between delete's running
//! check and its teardown.
//!
//! No step is retried or rolled back. A failure after `apply` leaves the
//! containers and site directory in place for the operator.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::credentials::{PASSWORD_LENGTH, generate_password};
use crate::descriptor::{
    APP_SERVICE, DescriptorImages, build_descriptor, descriptor_path, write_descriptor,
};
use crate::driver::{DriverError, OrchestratorDriver, project_name};
use crate::error::{Error, Result};
use crate::ports::{self, DEFAULT_BASE_PORT};
use crate::registry::SiteRegistry;
use crate::sanitize::sanitize_name;
use crate::site::{Site, SiteStatus, site_url};

/// Settings the lifecycle manager needs.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Base directory holding one directory per site
    pub sites_dir: PathBuf,
    /// Host name used when building site URLs
    pub public_host: String,
    /// Lowest host port handed out to a site
    pub base_port: u16,
    /// Images for the generated descriptors
    pub images: DescriptorImages,
}

impl ManagerConfig {
    /// Defaults rooted at `sites_dir`.
    pub fn new(sites_dir: impl Into<PathBuf>) -> Self {
        Self {
            sites_dir: sites_dir.into(),
            public_host: "localhost".to_string(),
            base_port: DEFAULT_BASE_PORT,
            images: DescriptorImages::default(),
        }
    }
}

impl From<&Config> for ManagerConfig {
    fn from(config: &Config) -> Self {
        Self {
            sites_dir: config.sites_dir.clone(),
            public_host: config.public_host.clone(),
            base_port: config.base_port,
            images: config.images.clone(),
        }
    }
}

/// Drives sites through create, start, stop and delete.
pub struct LifecycleManager {
    driver: Arc<dyn OrchestratorDriver>,
    registry: SiteRegistry,
    config: ManagerConfig,
    lifecycle_lock: Mutex<()>,
}

impl LifecycleManager {
    /// Create a manager. The driver is shared process-wide state.
    pub fn new(
        driver: Arc<dyn OrchestratorDriver>,
        registry: SiteRegistry,
        config: ManagerConfig,
    ) -> Self {
        Self {
            driver,
            registry,
            config,
            lifecycle_lock: Mutex::new(()),
        }
    }

    /// The site registry.
    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Directory holding a site's descriptor and data.
    pub fn site_dir(&self, sanitized_name: &str) -> PathBuf {
        self.config.sites_dir.join(sanitized_name)
    }

    /// Provision a new site and record it.
    pub async fn create(&self, name: &str, description: &str) -> Result<Site> {
        if name.trim().is_empty() || description.trim().is_empty() {
            return Err(Error::Validation(
                "Site name and description are required".to_string(),
            ));
        }

        let _guard = self.lifecycle_lock.lock().await;

        let sanitized = sanitize_name(name);
        let site_dir = self.site_dir(&sanitized);
        if self.is_reserved(&site_dir) {
            return Err(Error::Validation(format!("Site name '{name}' is reserved")));
        }

        let project = project_name(&sanitized);
        if let Some(existing) = self
            .registry
            .snapshot()
            .await
            .into_values()
            .find(|s| project_name(&s.sanitized_name()) == project)
        {
            return Err(Error::PreconditionFailed(format!(
                "Site name '{name}' collides with existing site {} ({})",
                existing.id, existing.name
            )));
        }

        info!(name = %name, project = %project, "Creating site");

        fs::create_dir_all(&site_dir).await?;

        let db_password = generate_password(PASSWORD_LENGTH);
        let port = ports::allocate_port(self.driver.as_ref(), self.config.base_port).await?;

        let descriptor = build_descriptor(&self.config.images, &sanitized, &db_password, port);
        let descriptor_path = write_descriptor(&site_dir, &descriptor)
            .await
            .map_err(|e| Error::ProvisionFailure(format!("failed to write descriptor: {e}")))?;

        if let Err(e) = self.driver.apply(&descriptor_path).await {
            error!(project = %project, port, error = %e, "Apply failed, leaving resources for cleanup");
            return Err(Error::ProvisionFailure(e.to_string()));
        }

        let container = self
            .driver
            .find_container(&project, APP_SERVICE)
            .await
            .map_err(provision_failure)?
            .ok_or_else(|| {
                error!(project = %project, "Application container missing after successful apply");
                Error::ProvisionFailure(format!(
                    "inconsistent orchestrator state: no {APP_SERVICE} container for project {project}"
                ))
            })?;

        let site = Site {
            id: container.short_id().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            url: site_url(&self.config.public_host, port),
            port,
            status: SiteStatus::from(container.state),
            created_at: Utc::now(),
        };

        self.registry
            .update(|sites| {
                sites.insert(site.id.clone(), site.clone());
                Ok::<_, Error>(())
            })
            .await?;

        info!(site_id = %site.id, project = %project, port, status = %site.status, "Site created");
        Ok(site)
    }

    /// Every registered site, with its last known status.
    pub async fn list(&self) -> Vec<Site> {
        self.registry.snapshot().await.into_values().collect()
    }

    /// One registered site.
    pub async fn get(&self, id: &str) -> Result<Site> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Stop a site's application container.
    pub async fn stop(&self, id: &str) -> Result<Site> {
        let _guard = self.lifecycle_lock.lock().await;
        let site = self.get(id).await?;

        self.driver.stop(&site.id).await.map_err(|e| {
            error!(site_id = %id, error = %e, "Failed to stop site");
            container_failure(e)
        })?;

        let site = self.set_status(id, SiteStatus::Stopped).await?;
        info!(site_id = %id, "Site stopped");
        Ok(site)
    }

    /// Start a site's application container and record its live status.
    pub async fn start(&self, id: &str) -> Result<Site> {
        let _guard = self.lifecycle_lock.lock().await;
        let site = self.get(id).await?;

        self.driver.start(&site.id).await.map_err(|e| {
            error!(site_id = %id, error = %e, "Failed to start site");
            container_failure(e)
        })?;

        let live = self
            .driver
            .get(&site.id)
            .await
            .map_err(container_failure)?
            .ok_or_else(|| {
                Error::ContainerOperationFailure(format!(
                    "container {} disappeared after start",
                    site.id
                ))
            })?;

        let site = self.set_status(id, SiteStatus::from(live.state)).await?;
        info!(site_id = %id, status = %site.status, "Site started");
        Ok(site)
    }

    /// Tear a stopped site down and forget it.
    ///
    /// A container that no longer exists counts as stopped.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lifecycle_lock.lock().await;

        let site = self.get(id).await?;

        match self.driver.get(&site.id).await.map_err(container_failure)? {
            Some(container) if container.state.is_running() => {
                return Err(Error::PreconditionFailed(
                    "Cannot delete a running site. Please stop it first.".to_string(),
                ));
            }
            Some(_) => {}
            None => {
                warn!(site_id = %id, "Container already gone, continuing with delete");
            }
        }

        let sanitized = site.sanitized_name();
        let site_dir = self.site_dir(&sanitized);

        if fs::try_exists(&site_dir).await? {
            let descriptor = descriptor_path(&site_dir);
            if fs::try_exists(&descriptor).await? {
                self.driver
                    .teardown(&descriptor, true)
                    .await
                    .map_err(|e| {
                        error!(site_id = %id, project = %sanitized, error = %e, "Teardown failed, keeping site directory");
                        Error::TeardownFailure(e.to_string())
                    })?;
            }
            fs::remove_dir_all(&site_dir).await?;
        }

        self.registry
            .update(|sites| {
                sites.remove(id);
                Ok::<_, Error>(())
            })
            .await?;

        info!(site_id = %id, project = %sanitized, "Site deleted");
        Ok(())
    }

    /// Whether a site directory would shadow the registry file or its temp sibling.
    fn is_reserved(&self, site_dir: &Path) -> bool {
        self.registry.path().starts_with(site_dir)
            || self.registry.temp_path().starts_with(site_dir)
    }

    /// Record a new status. Fails with `NotFound` if the site vanished meanwhile.
    async fn set_status(&self, id: &str, status: SiteStatus) -> Result<Site> {
        self.registry
            .update(|sites| {
                let site = sites
                    .get_mut(id)
                    .ok_or_else(|| Error::NotFound(id.to_string()))?;
                site.status = status;
                Ok(site.clone())
            })
            .await
    }
}

fn provision_failure(e: DriverError) -> Error {
    Error::ProvisionFailure(e.to_string())
}

fn container_failure(e: DriverError) -> Error {
    Error::ContainerOperationFailure(e.to_string())
}
