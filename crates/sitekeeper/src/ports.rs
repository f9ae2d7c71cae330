// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Host port allocation.
//!
//! Picks the lowest port at or above a base that no running container
//! publishes for the application port. This is a point-in-time decision with
//! no reservation; callers serialize allocation with the orchestrator apply.

use std::collections::HashSet;
use tracing::debug;

use crate::descriptor::APP_CONTAINER_PORT;
use crate::driver::{ContainerInfo, OrchestratorDriver};
use crate::error::{Error, Result};

/// Default lowest port handed out to a site.
pub const DEFAULT_BASE_PORT: u16 = 8000;

/// Host ports bound to the application port by running containers.
pub fn used_app_ports(containers: &[ContainerInfo]) -> HashSet<u16> {
    containers
        .iter()
        .filter(|c| c.state.is_running())
        .flat_map(|c| c.host_ports_for(APP_CONTAINER_PORT))
        .collect()
}

/// Lowest port `>= base` not in `used`. `None` when the range is exhausted.
pub fn lowest_free_port(base: u16, used: &HashSet<u16>) -> Option<u16> {
    (base..=u16::MAX).find(|port| !used.contains(port))
}

/// Query the orchestrator and pick a port.
pub async fn allocate_port(driver: &dyn OrchestratorDriver, base: u16) -> Result<u16> {
    let containers = driver
        .list_all()
        .await
        .map_err(|e| Error::ProvisionFailure(format!("failed to list containers: {e}")))?;

    let used = used_app_ports(&containers);
    let port = lowest_free_port(base, &used)
        .ok_or_else(|| Error::ProvisionFailure(format!("no free host port at or above {base}")))?;

    debug!(port, in_use = used.len(), "Allocated host port");
    Ok(port)
}
