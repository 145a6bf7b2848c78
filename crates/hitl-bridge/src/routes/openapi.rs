// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! OpenAPI documentation configuration.

use hitl_engine_client::ExecutionStatus;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::{decision, health, workflows};
use crate::dispatcher::{SignalResult, SignalStatus};
use crate::error::ErrorResponse;
use crate::health::{HealthState, HealthStatus};
use crate::query::{WorkflowPage, WorkflowSummary};
use crate::validator::{DecisionBody, DecisionPayload};

/// OpenAPI documentation for the bridge API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "HITL Bridge API",
        description = "Deliver human decisions to waiting workflow executions and query their status",
        license(name = "AGPL-3.0-or-later"),
    ),
    paths(
        health::health,
        decision::submit_decision,
        workflows::list_workflows,
        workflows::describe_workflow,
    ),
    components(
        schemas(
            health::HealthResponse,
            HealthStatus,
            HealthState,
            DecisionBody,
            DecisionPayload,
            SignalResult,
            SignalStatus,
            WorkflowPage,
            WorkflowSummary,
            ExecutionStatus,
            ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Engine connectivity"),
        (name = "decisions", description = "Human decision delivery"),
        (name = "workflows", description = "Workflow execution queries"),
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
