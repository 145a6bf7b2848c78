// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API routes.

pub mod decision;
pub mod health;
pub mod landing;
pub mod openapi;
pub mod workflows;

pub use decision::{decision_routes, status_code};
pub use health::{HealthResponse, health_routes};
pub use landing::landing_routes;
pub use openapi::{ApiDoc, swagger_ui};
pub use workflows::{ListParams, workflow_routes};
