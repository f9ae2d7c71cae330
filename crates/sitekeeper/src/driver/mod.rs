// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Driver module - orchestrator backends.

pub mod docker;
pub mod mock;
mod traits;

pub use docker::{DockerCliConfig, DockerCliDriver};
pub use mock::{MockCall, MockDriver};
pub use traits::*;
