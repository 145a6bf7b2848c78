// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Health endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use utoipa::ToSchema;

use crate::health::{HealthState, HealthStatus};
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub health: HealthStatus,
    /// Engine address.
    pub engine: String,
    /// Engine namespace.
    pub namespace: String,
}

/// Engine connectivity.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Engine healthy or degraded", body = HealthResponse),
        (status = 503, description = "Engine unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = state.health.current().await;
    let code = match health.status {
        HealthState::Healthy | HealthState::Degraded => StatusCode::OK,
        HealthState::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        code,
        Json(HealthResponse {
            health,
            engine: state.engine_url.clone(),
            namespace: state.namespace.clone(),
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
