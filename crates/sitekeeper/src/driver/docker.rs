// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Docker CLI driver implementation.
//!
//! Drives `docker compose` for descriptor apply/teardown and the `docker`
//! CLI for per-container operations. Pure orchestration logic, no registry
//! access. Every command is bounded by a timeout and killed on expiry.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::traits::*;

/// Docker driver configuration
#[derive(Debug, Clone)]
pub struct DockerCliConfig {
    /// Container engine CLI
    pub docker_bin: String,
    /// Compose command, program followed by its leading arguments
    pub compose_cmd: Vec<String>,
    /// Timeout for compose up/down
    pub provision_timeout: Duration,
    /// Timeout for inspect/list/start/stop
    pub container_timeout: Duration,
}

impl Default for DockerCliConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            compose_cmd: vec!["docker".to_string(), "compose".to_string()],
            provision_timeout: Duration::from_secs(300),
            container_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&crate::config::Config> for DockerCliConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            docker_bin: config.docker_bin.clone(),
            compose_cmd: config.compose_cmd.clone(),
            provision_timeout: config.provision_timeout,
            container_timeout: config.container_timeout,
        }
    }
}

fn is_no_such_object(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("no such container") || lower.contains("no such object")
}

/// `docker inspect` entry, reduced to the fields we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectContainer {
    id: String,
    state: InspectState,
    config: InspectConfig,
    network_settings: InspectNetwork,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectNetwork {
    #[serde(default)]
    ports: Option<HashMap<String, Option<Vec<InspectBinding>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectBinding {
    host_port: String,
}

impl TryFrom<InspectContainer> for ContainerInfo {
    type Error = DriverError;

    fn try_from(raw: InspectContainer) -> Result<Self> {
        let state = ContainerState::parse(&raw.state.status).ok_or_else(|| {
            DriverError::Other(format!(
                "unknown container status '{}' for {}",
                raw.state.status, raw.id
            ))
        })?;

        let mut published_ports: Vec<PortBinding> = Vec::new();
        for (key, bindings) in raw.network_settings.ports.unwrap_or_default() {
            // keys look like "80/tcp"
            let (port, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
            let Ok(container_port) = port.parse::<u16>() else {
                continue;
            };
            for binding in bindings.unwrap_or_default() {
                let Ok(host_port) = binding.host_port.parse::<u16>() else {
                    continue;
                };
                let binding = PortBinding {
                    container_port,
                    protocol: protocol.to_string(),
                    host_port,
                };
                // IPv4 and IPv6 bindings repeat the same port
                if !published_ports.contains(&binding) {
                    published_ports.push(binding);
                }
            }
        }
        published_ports.sort_by_key(|b| (b.container_port, b.host_port));

        Ok(ContainerInfo {
            id: raw.id,
            state,
            labels: raw.config.labels.unwrap_or_default(),
            published_ports,
        })
    }
}

/// Parse `docker inspect` output.
fn parse_inspect(stdout: &[u8]) -> Result<Vec<ContainerInfo>> {
    let raw: Vec<InspectContainer> = serde_json::from_slice(stdout)?;
    raw.into_iter().map(ContainerInfo::try_from).collect()
}

/// Orchestrator driver using the Docker CLI.
pub struct DockerCliDriver {
    config: DockerCliConfig,
}

impl DockerCliDriver {
    /// Create a new Docker driver
    pub fn new(config: DockerCliConfig) -> Self {
        Self { config }
    }

    /// Run a command to completion within `timeout`, without checking its exit code.
    async fn exec_unchecked(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(program, ?args, ?cwd, operation, "Running orchestrator command");

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                warn!(program, ?args, operation, timeout_secs = timeout.as_secs(), "Orchestrator command timed out");
                Err(DriverError::Timeout {
                    operation,
                    after: timeout,
                })
            }
        }
    }

    /// Run a command and fail on non-zero exit.
    async fn exec(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
        operation: &'static str,
    ) -> Result<Output> {
        let output = self
            .exec_unchecked(program, args, cwd, timeout, operation)
            .await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(exit_error(&output))
        }
    }

    async fn docker(&self, args: &[&str], operation: &'static str) -> Result<Output> {
        self.exec(
            &self.config.docker_bin,
            args,
            None,
            self.config.container_timeout,
            operation,
        )
        .await
    }

    /// Run `compose -f <file> -p <project> <action...>` next to the descriptor.
    async fn compose(
        &self,
        descriptor: &Path,
        action: &[&str],
        operation: &'static str,
    ) -> Result<()> {
        let project = descriptor_project(descriptor).ok_or_else(|| {
            DriverError::Other(format!(
                "cannot derive project name from {}",
                descriptor.display()
            ))
        })?;
        let file_name = descriptor
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DriverError::Other(format!("invalid descriptor path {}", descriptor.display()))
            })?;
        let dir = descriptor.parent().unwrap_or_else(|| Path::new("."));

        let (program, leading) = self
            .config
            .compose_cmd
            .split_first()
            .ok_or_else(|| DriverError::Other("compose command is empty".to_string()))?;

        let mut args: Vec<&str> = leading.iter().map(String::as_str).collect();
        args.extend(["-f", file_name, "-p", project.as_str()]);
        args.extend_from_slice(action);

        let started = std::time::Instant::now();
        match self
            .exec(program, &args, Some(dir), self.config.provision_timeout, operation)
            .await
        {
            Ok(_) => {
                info!(
                    project = %project,
                    operation,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Compose command completed"
                );
                Ok(())
            }
            Err(e) => {
                error!(project = %project, operation, error = %e, "Compose command failed");
                Err(e)
            }
        }
    }

    /// Inspect containers by id. Ids that vanished in the meantime are skipped.
    async fn inspect(&self, ids: &[&str]) -> Result<Vec<ContainerInfo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["inspect", "--type", "container"];
        args.extend_from_slice(ids);

        let output = self
            .exec_unchecked(
                &self.config.docker_bin,
                &args,
                None,
                self.config.container_timeout,
                "docker inspect",
            )
            .await?;

        // inspect prints every container it found and exits non-zero if any id was missing
        match parse_inspect(&output.stdout) {
            Ok(containers) => {
                if !output.status.success() {
                    debug!(
                        requested = ids.len(),
                        found = containers.len(),
                        "Some containers disappeared before inspect"
                    );
                }
                Ok(containers)
            }
            Err(_) if !output.status.success() => {
                let err = exit_error(&output);
                match &err {
                    DriverError::ExitCode { stderr, .. } if is_no_such_object(stderr) => {
                        Ok(Vec::new())
                    }
                    _ => Err(err),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Ids listed by `docker ps -a -q` with extra filters.
    async fn ps_ids(&self, filters: &[String]) -> Result<Vec<String>> {
        let mut args = vec!["ps", "-a", "-q", "--no-trunc"];
        for filter in filters {
            args.extend(["--filter", filter.as_str()]);
        }
        let output = self.docker(&args, "docker ps").await?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn container_action(
        &self,
        action: &'static str,
        container_id: &str,
        operation: &'static str,
    ) -> Result<()> {
        match self.docker(&[action, container_id], operation).await {
            Ok(_) => {
                info!(container_id = %container_id, operation, "Container operation completed");
                Ok(())
            }
            Err(DriverError::ExitCode { stderr, .. }) if is_no_such_object(&stderr) => {
                Err(DriverError::ContainerNotFound(container_id.to_string()))
            }
            Err(e) => {
                error!(container_id = %container_id, operation, error = %e, "Container operation failed");
                Err(e)
            }
        }
    }
}

fn exit_error(output: &Output) -> DriverError {
    DriverError::ExitCode {
        exit_code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[async_trait]
impl OrchestratorDriver for DockerCliDriver {
    fn driver_type(&self) -> &'static str {
        "docker"
    }

    async fn apply(&self, descriptor: &Path) -> Result<()> {
        self.compose(descriptor, &["up", "-d"], "compose up").await
    }

    async fn teardown(&self, descriptor: &Path, remove_volumes: bool) -> Result<()> {
        let action: &[&str] = if remove_volumes {
            &["down", "--volumes"]
        } else {
            &["down"]
        };
        self.compose(descriptor, action, "compose down").await
    }

    async fn find_container(
        &self,
        project: &str,
        service: &str,
    ) -> Result<Option<ContainerInfo>> {
        let project = project_name(project);
        let filters = [
            format!("label={PROJECT_LABEL}={project}"),
            format!("label={SERVICE_LABEL}={service}"),
        ];
        let ids = self.ps_ids(&filters).await?;
        let Some(id) = single_match(ids, &project, service)? else {
            return Ok(None);
        };
        Ok(self.inspect(&[id.as_str()]).await?.into_iter().next())
    }

    async fn get(&self, container_id: &str) -> Result<Option<ContainerInfo>> {
        Ok(self.inspect(&[container_id]).await?.into_iter().next())
    }

    async fn list_all(&self) -> Result<Vec<ContainerInfo>> {
        let ids = self.ps_ids(&[]).await?;
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.inspect(&refs).await
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        self.container_action("start", container_id, "docker start")
            .await
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        self.container_action("stop", container_id, "docker stop")
            .await
    }
}
