// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock driver for testing.
//!
//! Materializes descriptors into in-memory containers by reading the written
//! compose file, without touching any container engine.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::*;
use crate::descriptor::{parse_port_mapping, read_descriptor};

/// A call received by the mock driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `apply(descriptor)`
    Apply(PathBuf),
    /// `teardown(descriptor, remove_volumes)`
    Teardown {
        /// Descriptor path.
        descriptor: PathBuf,
        /// Whether volume removal was requested.
        remove_volumes: bool,
    },
    /// `find_container(project, service)`
    FindContainer {
        /// Project name.
        project: String,
        /// Service name.
        service: String,
    },
    /// `get(id)`
    Get(String),
    /// `list_all()`
    ListAll,
    /// `start(id)`
    Start(String),
    /// `stop(id)`
    Stop(String),
}

/// Internal recorded state of the mock driver.
#[derive(Debug, Default)]
pub struct MockState {
    containers: Vec<ContainerInfo>,
    calls: Vec<MockCall>,
    next_id: u64,
}

/// Mock driver for testing.
pub struct MockDriver {
    /// Recorded containers and calls
    pub state: Mutex<MockState>,
    /// If true, `apply` fails after recording the call
    pub fail_apply: bool,
    /// If true, `teardown` fails after recording the call
    pub fail_teardown: bool,
    /// If true, `start` and `stop` are rejected by the "engine"
    pub fail_container_ops: bool,
    /// Services `apply` silently skips, simulating a container that never appears
    pub skip_services: Vec<String>,
    /// State given to containers created by `apply`
    pub initial_state: ContainerState,
    /// Delay before `apply` creates containers, widening race windows in tests
    pub apply_delay: Duration,
    /// Delay before `teardown` removes containers
    pub teardown_delay: Duration,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create a new mock driver.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            fail_apply: false,
            fail_teardown: false,
            fail_container_ops: false,
            skip_services: Vec::new(),
            initial_state: ContainerState::Running,
            apply_delay: Duration::ZERO,
            teardown_delay: Duration::ZERO,
        }
    }

    /// Create a mock driver whose `apply` always fails.
    pub fn failing_apply() -> Self {
        Self {
            fail_apply: true,
            ..Self::new()
        }
    }

    /// Add a container directly, outside any descriptor.
    pub async fn insert_container(&self, container: ContainerInfo) {
        self.state.lock().await.containers.push(container);
    }

    /// Change a container's state.
    pub async fn set_state(&self, container_id: &str, state: ContainerState) {
        let mut guard = self.state.lock().await;
        if let Some(c) = guard
            .containers
            .iter_mut()
            .find(|c| c.matches_id(container_id))
        {
            c.state = state;
        }
    }

    /// Remove a container as if it was deleted behind our back.
    pub async fn remove_container(&self, container_id: &str) {
        self.state
            .lock()
            .await
            .containers
            .retain(|c| !c.matches_id(container_id));
    }

    /// Snapshot of every container.
    pub async fn containers(&self) -> Vec<ContainerInfo> {
        self.state.lock().await.containers.clone()
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Teardown calls received so far.
    pub async fn teardown_calls(&self) -> Vec<MockCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, MockCall::Teardown { .. }))
            .collect()
    }

    async fn record(&self, call: MockCall) {
        self.state.lock().await.calls.push(call);
    }

    fn rejected(operation: &str) -> DriverError {
        DriverError::ExitCode {
            exit_code: 1,
            stderr: format!("mock {operation} failure"),
        }
    }
}

#[async_trait]
impl OrchestratorDriver for MockDriver {
    fn driver_type(&self) -> &'static str {
        "mock"
    }

    async fn apply(&self, descriptor: &Path) -> Result<()> {
        self.record(MockCall::Apply(descriptor.to_path_buf())).await;
        if self.fail_apply {
            return Err(Self::rejected("apply"));
        }

        let project = descriptor_project(descriptor).ok_or_else(|| {
            DriverError::Other(format!("bad descriptor path {}", descriptor.display()))
        })?;
        let compose = read_descriptor(descriptor)
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;

        if !self.apply_delay.is_zero() {
            tokio::time::sleep(self.apply_delay).await;
        }

        let mut guard = self.state.lock().await;
        for (service, spec) in &compose.services {
            if self.skip_services.contains(service) {
                continue;
            }
            let exists = guard
                .containers
                .iter()
                .any(|c| {
                    c.project() == Some(project.as_str()) && c.service() == Some(service.as_str())
                });
            if exists {
                continue;
            }

            guard.next_id += 1;
            let id = format!("{:012x}{}", 0x5173_0000_0000_u64 + guard.next_id, "0".repeat(52));

            let mut labels: HashMap<String, String> = spec.labels.clone().into_iter().collect();
            labels.insert(PROJECT_LABEL.to_string(), project.clone());
            labels.insert(SERVICE_LABEL.to_string(), service.clone());

            let published_ports = spec
                .ports
                .iter()
                .filter_map(|m| parse_port_mapping(m))
                .map(|(host_port, container_port)| PortBinding {
                    container_port,
                    protocol: "tcp".to_string(),
                    host_port,
                })
                .collect();

            guard.containers.push(ContainerInfo {
                id,
                state: self.initial_state,
                labels,
                published_ports,
            });
        }
        Ok(())
    }

    async fn teardown(&self, descriptor: &Path, remove_volumes: bool) -> Result<()> {
        self.record(MockCall::Teardown {
            descriptor: descriptor.to_path_buf(),
            remove_volumes,
        })
        .await;
        if !self.teardown_delay.is_zero() {
            tokio::time::sleep(self.teardown_delay).await;
        }
        if self.fail_teardown {
            return Err(Self::rejected("teardown"));
        }

        let Some(project) = descriptor_project(descriptor) else {
            return Ok(());
        };
        self.state
            .lock()
            .await
            .containers
            .retain(|c| c.project() != Some(project.as_str()));
        Ok(())
    }

    async fn find_container(
        &self,
        project: &str,
        service: &str,
    ) -> Result<Option<ContainerInfo>> {
        self.record(MockCall::FindContainer {
            project: project.to_string(),
            service: service.to_string(),
        })
        .await;
        let project = project_name(project);
        let matches: Vec<ContainerInfo> = self
            .state
            .lock()
            .await
            .containers
            .iter()
            .filter(|c| c.project() == Some(project.as_str()) && c.service() == Some(service))
            .cloned()
            .collect();
        single_match(matches, &project, service)
    }

    async fn get(&self, container_id: &str) -> Result<Option<ContainerInfo>> {
        self.record(MockCall::Get(container_id.to_string())).await;
        Ok(self
            .state
            .lock()
            .await
            .containers
            .iter()
            .find(|c| c.matches_id(container_id))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<ContainerInfo>> {
        self.record(MockCall::ListAll).await;
        Ok(self.containers().await)
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        self.record(MockCall::Start(container_id.to_string())).await;
        if self.fail_container_ops {
            return Err(Self::rejected("start"));
        }
        let mut guard = self.state.lock().await;
        let container = guard
            .containers
            .iter_mut()
            .find(|c| c.matches_id(container_id))
            .ok_or_else(|| DriverError::ContainerNotFound(container_id.to_string()))?;
        container.state = ContainerState::Running;
        Ok(())
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        self.record(MockCall::Stop(container_id.to_string())).await;
        if self.fail_container_ops {
            return Err(Self::rejected("stop"));
        }
        let mut guard = self.state.lock().await;
        let container = guard
            .containers
            .iter_mut()
            .find(|c| c.matches_id(container_id))
            .ok_or_else(|| DriverError::ContainerNotFound(container_id.to_string()))?;
        container.state = ContainerState::Exited;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{APP_SERVICE, DB_SERVICE, DescriptorImages, build_descriptor, write_descriptor};

    async fn write_site(root: &Path, name: &str, port: u16) -> PathBuf {
        let dir = root.join(name);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let descriptor = build_descriptor(&DescriptorImages::default(), name, "pw", port);
        write_descriptor(&dir, &descriptor).await.unwrap()
    }

    #[tokio::test]
    async fn test_apply_creates_both_services() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_site(tmp.path(), "blog", 8000).await;
        let driver = MockDriver::new();

        driver.apply(&path).await.unwrap();

        let app = driver.find_container("blog", APP_SERVICE).await.unwrap().unwrap();
        assert_eq!(app.state, ContainerState::Running);
        assert_eq!(app.host_ports_for(80).collect::<Vec<_>>(), vec![8000]);
        assert!(driver.find_container("blog", DB_SERVICE).await.unwrap().is_some());
        assert_eq!(driver.containers().await.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_site(tmp.path(), "blog", 8000).await;
        let driver = MockDriver::new();

        driver.apply(&path).await.unwrap();
        driver.apply(&path).await.unwrap();

        assert_eq!(driver.containers().await.len(), 2);
    }

    #[tokio::test]
    async fn test_short_ids_are_distinct() {
        let tmp = tempfile::TempDir::new().unwrap();
        let driver = MockDriver::new();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let path = write_site(tmp.path(), name, 8000 + i as u16).await;
            driver.apply(&path).await.unwrap();
        }

        let mut ids: Vec<String> = driver
            .containers()
            .await
            .iter()
            .map(|c| c.short_id().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn test_teardown_removes_project_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blog = write_site(tmp.path(), "blog", 8000).await;
        let shop = write_site(tmp.path(), "shop", 8001).await;
        let driver = MockDriver::new();
        driver.apply(&blog).await.unwrap();
        driver.apply(&shop).await.unwrap();

        driver.teardown(&blog, true).await.unwrap();

        let remaining = driver.containers().await;
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|c| c.project() == Some("shop")));
        assert_eq!(
            driver.teardown_calls().await,
            vec![MockCall::Teardown {
                descriptor: blog,
                remove_volumes: true
            }]
        );
    }

    #[tokio::test]
    async fn test_start_stop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_site(tmp.path(), "blog", 8000).await;
        let driver = MockDriver::new();
        driver.apply(&path).await.unwrap();
        let app = driver.find_container("blog", APP_SERVICE).await.unwrap().unwrap();

        driver.stop(app.short_id()).await.unwrap();
        let stopped = driver.get(app.short_id()).await.unwrap().unwrap();
        assert_eq!(stopped.state, ContainerState::Exited);

        driver.start(app.short_id()).await.unwrap();
        let started = driver.get(app.short_id()).await.unwrap().unwrap();
        assert_eq!(started.state, ContainerState::Running);
    }

    #[tokio::test]
    async fn test_start_missing_container() {
        let driver = MockDriver::new();
        let err = driver.start("deadbeef").await.unwrap_err();
        assert!(matches!(err, DriverError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_apply() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_site(tmp.path(), "blog", 8000).await;
        let driver = MockDriver::failing_apply();

        assert!(driver.apply(&path).await.is_err());
        assert!(driver.containers().await.is_empty());
        assert_eq!(driver.calls().await, vec![MockCall::Apply(path)]);
    }

    #[tokio::test]
    async fn test_project_is_normalized() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_site(tmp.path(), "my.blog", 8000).await;
        let driver = MockDriver::new();

        driver.apply(&path).await.unwrap();

        let app = driver.find_container("my.blog", APP_SERVICE).await.unwrap().unwrap();
        assert_eq!(app.project(), Some("myblog"));
        assert!(driver.find_container("myblog", APP_SERVICE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_container_rejects_duplicates() {
        let driver = MockDriver::new();
        for id in ["aaaaaaaaaaaa", "bbbbbbbbbbbb"] {
            driver
                .insert_container(ContainerInfo {
                    id: id.to_string(),
                    state: ContainerState::Running,
                    labels: HashMap::from([
                        (PROJECT_LABEL.to_string(), "blog".to_string()),
                        (SERVICE_LABEL.to_string(), APP_SERVICE.to_string()),
                    ]),
                    published_ports: Vec::new(),
                })
                .await;
        }

        let err = driver.find_container("blog", APP_SERVICE).await.unwrap_err();
        assert!(matches!(err, DriverError::Other(_)));
    }

    #[tokio::test]
    async fn test_skip_services() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_site(tmp.path(), "blog", 8000).await;
        let driver = MockDriver {
            skip_services: vec![APP_SERVICE.to_string()],
            ..MockDriver::new()
        };

        driver.apply(&path).await.unwrap();

        assert!(driver.find_container("blog", APP_SERVICE).await.unwrap().is_none());
        assert!(driver.find_container("blog", DB_SERVICE).await.unwrap().is_some());
    }
}
