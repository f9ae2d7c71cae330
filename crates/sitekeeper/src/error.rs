// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for sitekeeper.

use thiserror::Error;

/// Lifecycle errors.
///
/// Validation and precondition errors are raised before any side effect.
/// Orchestrator failures carry the underlying engine message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Caller input was rejected.
    #[error("{0}")]
    Validation(String),

    /// Site id is not known to the registry.
    #[error("Site {0} not found")]
    NotFound(String),

    /// Operation is not allowed in the site's current state.
    #[error("{0}")]
    PreconditionFailed(String),

    /// Bringing a site up failed or left the orchestrator in an inconsistent state.
    #[error("Provisioning failed: {0}")]
    ProvisionFailure(String),

    /// Tearing a site down failed.
    #[error("Teardown failed: {0}")]
    TeardownFailure(String),

    /// Starting, stopping or inspecting a container failed.
    #[error("Container operation failed: {0}")]
    ContainerOperationFailure(String),

    /// The registry file could not be written.
    #[error("Registry error: {0}")]
    RegistryIo(#[from] crate::registry::RegistryError),

    /// Filesystem operation on a site directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using sitekeeper Error.
pub type Result<T> = std::result::Result<T, Error>;
