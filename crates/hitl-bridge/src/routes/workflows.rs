// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow listing and lookup endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ApiError, ErrorResponse};
use crate::query::{ListQuery, WorkflowPage, WorkflowSummary};
use crate::state::AppState;

/// Query parameters for listing workflows.
///
/// `pageSize` is taken as text so a non-numeric value gets the same JSON
/// error body as every other bad parameter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Engine filter expression, passed through untouched.
    pub filter: Option<String>,
    /// Page size; clamped to the configured maximum.
    #[param(value_type = Option<i64>)]
    pub page_size: Option<String>,
    /// Continuation token from a previous response.
    pub page_token: Option<String>,
}

impl TryFrom<ListParams> for ListQuery {
    type Error = ApiError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let page_size = match params.page_size.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| ApiError::BadRequest("pageSize must be an integer".to_string()))?,
            ),
        };
        Ok(ListQuery {
            filter: params.filter,
            page_size,
            page_token: params.page_token,
        })
    }
}

/// List workflow executions.
#[utoipa::path(
    get,
    path = "/workflows",
    params(ListParams),
    responses(
        (status = 200, description = "One page of executions", body = WorkflowPage),
        (status = 400, description = "Oversized filter, bad page size or malformed page token", body = ErrorResponse),
        (status = 503, description = "Engine unavailable", body = ErrorResponse),
    ),
    tag = "workflows"
)]
pub async fn list_workflows(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<WorkflowPage>, ApiError> {
    let query = ListQuery::try_from(params)?;
    let page = state.queries.list(query).await?;
    Ok(Json(page))
}

/// Look up one workflow execution.
#[utoipa::path(
    get,
    path = "/workflows/{workflowId}",
    params(("workflowId" = String, Path, description = "Workflow ID")),
    responses(
        (status = 200, description = "Execution summary", body = WorkflowSummary),
        (status = 400, description = "Invalid workflow ID", body = ErrorResponse),
        (status = 404, description = "No execution with this workflow ID", body = ErrorResponse),
        (status = 503, description = "Engine unavailable", body = ErrorResponse),
    ),
    tag = "workflows"
)]
pub async fn describe_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowSummary>, ApiError> {
    let summary = state.queries.describe(&workflow_id).await?;
    Ok(Json(summary))
}

pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflows", get(list_workflows))
        .route("/workflows/{workflowId}", get(describe_workflow))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_to_query() {
        let query = ListQuery::try_from(ListParams {
            filter: Some("Status = 'Running'".into()),
            page_size: Some(" 15 ".into()),
            page_token: None,
        })
        .unwrap();
        assert_eq!(query.page_size, Some(15));
        assert_eq!(query.filter.as_deref(), Some("Status = 'Running'"));

        let blank = ListQuery::try_from(ListParams {
            page_size: Some(String::new()),
            ..ListParams::default()
        })
        .unwrap();
        assert_eq!(blank.page_size, None);

        assert!(
            ListQuery::try_from(ListParams {
                page_size: Some("ten".into()),
                ..ListParams::default()
            })
            .is_err()
        );
    }
}
