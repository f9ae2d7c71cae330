// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for sitekeeper tests.
//!
//! Provides TestContext wiring a mock driver, a temporary sites directory,
//! a registry and a lifecycle manager.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitekeeper::driver::{MockDriver, OrchestratorDriver};
use sitekeeper::manager::{LifecycleManager, ManagerConfig};
use sitekeeper::registry::SiteRegistry;

/// Test context owning a temporary sites directory.
pub struct TestContext {
    pub driver: Arc<MockDriver>,
    pub manager: Arc<LifecycleManager>,
    pub sites_dir: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestContext {
    /// Context backed by a default mock driver.
    pub fn new() -> Self {
        Self::with_driver(MockDriver::new())
    }

    /// Context backed by a configured mock driver.
    pub fn with_driver(driver: MockDriver) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let sites_dir = temp_dir.path().join("sites");
        let driver = Arc::new(driver);
        let manager = Arc::new(build_manager(driver.clone(), &sites_dir));

        Self {
            driver,
            manager,
            sites_dir,
            _temp_dir: temp_dir,
        }
    }

    /// A second manager over the same directory and driver, as after a restart.
    pub fn restarted_manager(&self) -> LifecycleManager {
        build_manager(self.driver.clone(), &self.sites_dir)
    }

    /// Path of the registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.sites_dir.join("sites.json")
    }

    /// Directory of a site by sanitized name.
    pub fn site_dir(&self, sanitized_name: &str) -> PathBuf {
        self.sites_dir.join(sanitized_name)
    }
}

fn build_manager(driver: Arc<MockDriver>, sites_dir: &Path) -> LifecycleManager {
    let registry = SiteRegistry::new(sites_dir.join("sites.json"));
    LifecycleManager::new(
        driver as Arc<dyn OrchestratorDriver>,
        registry,
        ManagerConfig::new(sites_dir),
    )
}
