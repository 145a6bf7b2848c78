// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decision submission endpoint.

use axum::{Json, Router, body::Bytes, extract::State, http::StatusCode, routing::post};

use crate::dispatcher::{SignalResult, SignalStatus};
use crate::state::AppState;
use crate::validator::DecisionBody;

/// HTTP status for a dispatch outcome.
pub fn status_code(status: SignalStatus) -> StatusCode {
    match status {
        SignalStatus::Delivered => StatusCode::OK,
        SignalStatus::NotFound => StatusCode::NOT_FOUND,
        SignalStatus::AlreadyCompleted => StatusCode::CONFLICT,
        SignalStatus::InvalidSignal => StatusCode::UNPROCESSABLE_ENTITY,
        SignalStatus::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Deliver a human decision to a waiting workflow execution.
///
/// The body is read raw so that malformed JSON is reported as an
/// `InvalidSignal` result like any other validation failure.
#[utoipa::path(
    post,
    path = "/decision",
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Signal delivered", body = SignalResult),
        (status = 404, description = "No execution with this workflow ID", body = SignalResult),
        (status = 409, description = "Execution already completed", body = SignalResult),
        (status = 422, description = "Invalid decision request", body = SignalResult),
        (status = 503, description = "Engine unavailable, retry later", body = SignalResult),
    ),
    tag = "decisions"
)]
pub async fn submit_decision(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<SignalResult>) {
    let result = state.dispatcher.dispatch(&body).await;
    (status_code(result.status), Json(result))
}

pub fn decision_routes() -> Router<AppState> {
    Router::new().route("/decision", post(submit_decision))
}
