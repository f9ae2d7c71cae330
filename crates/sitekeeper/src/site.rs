// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Site records.
//!
//! A [`Site`] is what the registry persists and what the API returns. The
//! database credential is deliberately absent: it only lives in the site's
//! descriptor and the database container's environment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::driver::ContainerState;
use crate::sanitize::sanitize_name;

/// Logical site status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    /// Containers exist but were never started.
    Created,
    /// Application container is running.
    Running,
    /// Application container is not running.
    Stopped,
}

impl SiteStatus {
    /// Status string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Created => "created",
            SiteStatus::Running => "running",
            SiteStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ContainerState> for SiteStatus {
    fn from(state: ContainerState) -> Self {
        match state {
            ContainerState::Created => SiteStatus::Created,
            ContainerState::Running | ContainerState::Restarting => SiteStatus::Running,
            ContainerState::Paused
            | ContainerState::Removing
            | ContainerState::Exited
            | ContainerState::Dead => SiteStatus::Stopped,
        }
    }
}

/// A provisioned site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Abbreviated id of the application container.
    pub id: String,
    /// Display name as supplied by the caller.
    pub name: String,
    /// Free text description.
    pub description: String,
    /// `http://<host>:<port>`
    pub url: String,
    /// Host port bound to the application.
    pub port: u16,
    /// Last known status.
    pub status: SiteStatus,
    /// Creation time, never mutated.
    pub created_at: DateTime<Utc>,
}

impl Site {
    /// Orchestrator project and directory name of this site.
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }
}

/// URL of a site published on `port`.
pub fn site_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}
