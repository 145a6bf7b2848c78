// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow listing and lookup.
//!
//! Filters go to the engine untouched apart from a length bound. Records are
//! projected to [`WorkflowSummary`]; a malformed record is skipped with a
//! warning instead of failing the page.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hitl_engine_client::{
    EngineClient, EngineError, ExecutionStatus, ListExecutionsOptions, RawExecution,
};
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::config::PaginationConfig;
use crate::validator::validate_workflow_id;

/// Listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Engine filter expression, opaque to the bridge.
    pub filter: Option<String>,
    /// Requested page size; the configured default applies when absent.
    pub page_size: Option<i64>,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
}

/// Read projection of one workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub run_id: String,
    pub workflow_type: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    /// Present only once the execution is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<DateTime<Utc>>,
}

impl WorkflowSummary {
    /// Project an engine record, or explain why it cannot be.
    pub fn from_record(record: &RawExecution) -> Result<Self, String> {
        let workflow_id = record.workflow_id().ok_or("missing execution.workflowId")?;
        let run_id = record.run_id().ok_or("missing execution.runId")?;
        let workflow_type = record.workflow_type().ok_or("missing type.name")?;
        let status: ExecutionStatus = record.status().ok_or("missing status")?.parse()?;
        let start_time = parse_time(record.start_time().ok_or("missing startTime")?)
            .map_err(|e| format!("invalid startTime: {}", e))?;

        let close_time = match record.close_time() {
            Some(raw) if status.is_terminal() => {
                Some(parse_time(raw).map_err(|e| format!("invalid closeTime: {}", e))?)
            }
            _ => None,
        };

        Ok(Self {
            workflow_id: workflow_id.to_string(),
            run_id: run_id.to_string(),
            workflow_type: workflow_type.to_string(),
            status,
            start_time,
            close_time,
        })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

/// One page of workflow summaries.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPage {
    pub executions: Vec<WorkflowSummary>,
    /// Token for the next page; absent when exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Query failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The caller's query is unusable.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("workflow execution not found: {0}")]
    NotFound(String),

    /// The engine could not answer.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

impl From<EngineError> for QueryError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Rejected(reason) => {
                QueryError::InvalidQuery(format!("engine rejected the query: {}", reason))
            }
            EngineError::NotFound(id) => QueryError::NotFound(id),
            EngineError::Timeout(ms) => {
                QueryError::Unavailable(format!("engine did not respond within {} ms", ms))
            }
            EngineError::AlreadyCompleted(_)
            | EngineError::Unavailable(_)
            | EngineError::Config(_) => QueryError::Unavailable("engine unavailable".to_string()),
        }
    }
}

/// Read-only access to workflow executions.
#[derive(Clone)]
pub struct WorkflowQueryService {
    engine: Arc<dyn EngineClient>,
    limits: PaginationConfig,
}

impl WorkflowQueryService {
    pub fn new(engine: Arc<dyn EngineClient>, limits: PaginationConfig) -> Self {
        Self { engine, limits }
    }

    /// Page size actually sent to the engine.
    ///
    /// Clamps into `[1, max_page_size]`, or rejects out-of-range values in
    /// strict mode.
    pub fn effective_page_size(&self, requested: Option<i64>) -> Result<u32, QueryError> {
        let max = i64::from(self.limits.max_page_size);
        let Some(requested) = requested else {
            return Ok(self.limits.default_page_size);
        };
        if self.limits.strict && !(1..=max).contains(&requested) {
            return Err(QueryError::InvalidQuery(format!(
                "pageSize must be between 1 and {}",
                max
            )));
        }
        // Bounded by max_page_size, which is a u32.
        Ok(requested.clamp(1, max) as u32)
    }

    /// List one page of executions.
    pub async fn list(&self, query: ListQuery) -> Result<WorkflowPage, QueryError> {
        let page_size = self.effective_page_size(query.page_size)?;
        let mut options = ListExecutionsOptions::new(page_size);

        if let Some(filter) = query.filter.filter(|f| !f.trim().is_empty()) {
            if filter.len() > self.limits.max_filter_len {
                return Err(QueryError::InvalidQuery(format!(
                    "filter must be at most {} bytes",
                    self.limits.max_filter_len
                )));
            }
            options = options.with_query(filter);
        }

        if let Some(token) = query.page_token.filter(|t| !t.is_empty()) {
            self.check_page_token(&token)?;
            options = options.with_page_token(token);
        }

        let page = self.engine.list_executions(&options).await?;

        let received = page.executions.len();
        let executions: Vec<WorkflowSummary> = page
            .executions
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match WorkflowSummary::from_record(record) {
                Ok(summary) => Some(summary),
                Err(reason) => {
                    warn!(index, reason = %reason, "Skipping malformed execution record");
                    None
                }
            })
            .collect();

        debug!(
            page_size,
            received,
            returned = executions.len(),
            has_more = page.next_page_token.is_some(),
            "Listed workflow executions"
        );

        Ok(WorkflowPage {
            executions,
            next_page_token: page.next_page_token,
        })
    }

    /// Look up one execution by workflow ID.
    pub async fn describe(&self, workflow_id: &str) -> Result<WorkflowSummary, QueryError> {
        let workflow_id = validate_workflow_id(workflow_id)
            .map_err(|reason| QueryError::InvalidQuery(format!("workflowId {}", reason)))?;

        let record = self.engine.describe_execution(&workflow_id).await?;
        WorkflowSummary::from_record(&record).map_err(|reason| {
            warn!(workflow_id = %workflow_id, reason = %reason, "Malformed execution record");
            QueryError::Unavailable("engine returned a malformed execution record".to_string())
        })
    }

    fn check_page_token(&self, token: &str) -> Result<(), QueryError> {
        if token.len() > self.limits.max_page_token_len {
            return Err(QueryError::InvalidQuery(format!(
                "pageToken must be at most {} bytes",
                self.limits.max_page_token_len
            )));
        }
        STANDARD
            .decode(token)
            .map(|_| ())
            .map_err(|_| QueryError::InvalidQuery("pageToken is malformed".to_string()))
    }
}
