// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Orchestrator driver trait definitions.
//!
//! Defines the abstract interface the lifecycle manager uses to materialize
//! descriptors into containers and to control those containers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Label carrying the compose project a container belongs to.
pub const PROJECT_LABEL: &str = "com.docker.compose.project";

/// Label carrying the compose service a container was created for.
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Length of the abbreviated container id used as the site id.
pub const SHORT_ID_LEN: usize = 12;

/// Errors from driver operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    /// The engine did not answer in time.
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        /// Operation that was running.
        operation: &'static str,
        /// Timeout that expired.
        after: Duration,
    },

    /// Command exited with non-zero code.
    #[error("Exit code {exit_code}: {stderr}")]
    ExitCode {
        /// Exit code from the process (-1 when killed by a signal).
        exit_code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// No container with this id exists.
    #[error("No such container: {0}")]
    ContainerNotFound(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization of engine output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Container state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Created but never started.
    Created,
    /// Running.
    Running,
    /// Paused.
    Paused,
    /// Restarting under its restart policy.
    Restarting,
    /// Being removed.
    Removing,
    /// Stopped.
    Exited,
    /// Failed to stop or be removed.
    Dead,
}

impl ContainerState {
    /// Parse the engine's status string.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "restarting" => Some(Self::Restarting),
            "removing" => Some(Self::Removing),
            "exited" => Some(Self::Exited),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }

    /// Engine status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
        }
    }

    /// Whether the container holds its resources (ports, volumes) right now.
    ///
    /// A restarting container is about to run again under its restart policy.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::Restarting)
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A port published on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port inside the container.
    pub container_port: u16,
    /// Protocol (`tcp` or `udp`).
    pub protocol: String,
    /// Port on the host.
    pub host_port: u16,
}

/// Snapshot of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Full engine-assigned id.
    pub id: String,
    /// Current state.
    pub state: ContainerState,
    /// Container labels.
    pub labels: HashMap<String, String>,
    /// Host-published ports.
    pub published_ports: Vec<PortBinding>,
}

impl ContainerInfo {
    /// Abbreviated id, stable for the container's lifetime.
    pub fn short_id(&self) -> &str {
        self.id.get(..SHORT_ID_LEN).unwrap_or(&self.id)
    }

    /// Compose project label, if any.
    pub fn project(&self) -> Option<&str> {
        self.labels.get(PROJECT_LABEL).map(String::as_str)
    }

    /// Compose service label, if any.
    pub fn service(&self) -> Option<&str> {
        self.labels.get(SERVICE_LABEL).map(String::as_str)
    }

    /// Host ports bound to `container_port` over TCP.
    pub fn host_ports_for(&self, container_port: u16) -> impl Iterator<Item = u16> + '_ {
        self.published_ports
            .iter()
            .filter(move |b| b.container_port == container_port && b.protocol == "tcp")
            .map(|b| b.host_port)
    }

    /// Whether an id or id prefix refers to this container.
    pub fn matches_id(&self, id: &str) -> bool {
        !id.is_empty() && self.id.starts_with(id)
    }
}

/// Orchestrator project name for a site directory name.
///
/// Compose only accepts `[a-z0-9_-]`; dots and anything else are dropped.
/// Two sites whose names map to the same project would share containers and
/// volumes, so this is the identity every driver and the manager compare on.
pub fn project_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
        .collect()
}

/// Project name of a descriptor, derived from the directory holding it.
pub fn descriptor_project(descriptor: &Path) -> Option<String> {
    let dir = descriptor.parent()?.file_name()?.to_str()?;
    Some(project_name(dir)).filter(|p| !p.is_empty())
}

/// The one container a project/service lookup found, if any.
///
/// More than one match means the project was applied twice or edited by
/// hand; no single container can stand for the service then.
pub fn single_match<T>(matches: Vec<T>, project: &str, service: &str) -> Result<Option<T>> {
    if matches.len() > 1 {
        return Err(DriverError::Other(format!(
            "{} containers match service {service} in project {project}",
            matches.len()
        )));
    }
    Ok(matches.into_iter().next())
}

/// Trait for orchestrator drivers.
///
/// Drivers are PURE orchestration backends - they do NOT touch the registry.
/// Registry updates are handled by the caller.
#[async_trait]
pub trait OrchestratorDriver: Send + Sync {
    /// Driver type identifier (e.g., "docker", "mock")
    fn driver_type(&self) -> &'static str;

    /// Bring up every service declared in the descriptor.
    ///
    /// The project name is the name of the directory holding the descriptor.
    async fn apply(&self, descriptor: &Path) -> Result<()>;

    /// Stop and remove every service of the descriptor's project.
    async fn teardown(&self, descriptor: &Path, remove_volumes: bool) -> Result<()>;

    /// Find the container created for `service` within `project`.
    ///
    /// `project` is normalized with [`project_name`]. Fails if more than one
    /// container matches.
    async fn find_container(&self, project: &str, service: &str)
    -> Result<Option<ContainerInfo>>;

    /// Inspect one container. `None` if it does not exist.
    async fn get(&self, container_id: &str) -> Result<Option<ContainerInfo>>;

    /// All containers, running or not.
    async fn list_all(&self) -> Result<Vec<ContainerInfo>>;

    /// Start a container.
    async fn start(&self, container_id: &str) -> Result<()>;

    /// Stop a container.
    async fn stop(&self, container_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(id: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            state: ContainerState::Running,
            labels: HashMap::from([
                (PROJECT_LABEL.to_string(), "blog".to_string()),
                (SERVICE_LABEL.to_string(), "app".to_string()),
            ]),
            published_ports: vec![
                PortBinding {
                    container_port: 80,
                    protocol: "tcp".to_string(),
                    host_port: 8001,
                },
                PortBinding {
                    container_port: 53,
                    protocol: "udp".to_string(),
                    host_port: 5353,
                },
            ],
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(container("0123456789abcdef").short_id(), "0123456789ab");
        assert_eq!(container("abc").short_id(), "abc");
    }

    #[test]
    fn test_labels() {
        let c = container("abc");
        assert_eq!(c.project(), Some("blog"));
        assert_eq!(c.service(), Some("app"));
    }

    #[test]
    fn test_host_ports_for() {
        let c = container("abc");
        assert_eq!(c.host_ports_for(80).collect::<Vec<_>>(), vec![8001]);
        assert_eq!(c.host_ports_for(53).count(), 0);
    }

    #[test]
    fn test_matches_id_prefix() {
        let c = container("0123456789abcdef");
        assert!(c.matches_id("0123456789ab"));
        assert!(c.matches_id("0123456789abcdef"));
        assert!(!c.matches_id("fff"));
        assert!(!c.matches_id(""));
    }

    #[test]
    fn test_state_parse_roundtrip() {
        for s in [
            "created",
            "running",
            "paused",
            "restarting",
            "removing",
            "exited",
            "dead",
        ] {
            assert_eq!(ContainerState::parse(s).map(|st| st.as_str()), Some(s));
        }
        assert_eq!(ContainerState::parse("bogus"), None);
    }

    #[test]
    fn test_is_running() {
        assert!(ContainerState::Running.is_running());
        assert!(ContainerState::Restarting.is_running());
        assert!(!ContainerState::Exited.is_running());
        assert!(!ContainerState::Created.is_running());
    }

    #[test]
    fn test_project_name() {
        assert_eq!(project_name("my-site_"), "my-site_");
        assert_eq!(project_name("my.site"), "mysite");
        assert_eq!(project_name("mysite"), "mysite");
        assert_eq!(project_name("Blog"), "blog");
    }

    #[test]
    fn test_descriptor_project() {
        let path = Path::new("sites/my-blog/docker-compose.yml");
        assert_eq!(descriptor_project(path).as_deref(), Some("my-blog"));
        let path = Path::new("sites/my.blog/docker-compose.yml");
        assert_eq!(descriptor_project(path).as_deref(), Some("myblog"));
        assert_eq!(descriptor_project(Path::new("sites/.../docker-compose.yml")), None);
    }

    #[test]
    fn test_single_match() {
        assert_eq!(single_match(Vec::<u8>::new(), "blog", "app").unwrap(), None);
        assert_eq!(single_match(vec![7], "blog", "app").unwrap(), Some(7));
        let err = single_match(vec![1, 2], "blog", "app").unwrap_err();
        assert!(matches!(err, DriverError::Other(_)));
        assert!(err.to_string().contains("2 containers"));
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Timeout {
            operation: "compose up",
            after: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "compose up timed out after 300s");

        let err = DriverError::ExitCode {
            exit_code: 1,
            stderr: "boom".to_string(),
        };
        assert!(err.to_string().contains("Exit code 1"));
        assert!(err.to_string().contains("boom"));
    }
}
