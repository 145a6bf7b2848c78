// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Types exchanged with the workflow engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Execution status as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum ExecutionStatus {
    /// Execution is in progress (possibly waiting for a signal).
    Running,
    /// Execution finished successfully.
    Completed,
    /// Execution finished with an error.
    Failed,
    /// Execution was cancelled.
    Canceled,
    /// Execution was forcibly terminated.
    Terminated,
    /// Execution exceeded its timeout.
    TimedOut,
    /// Execution closed and continued in a new run.
    ContinuedAsNew,
}

impl ExecutionStatus {
    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }

    /// Name as used in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::Failed => "Failed",
            ExecutionStatus::Canceled => "Canceled",
            ExecutionStatus::Terminated => "Terminated",
            ExecutionStatus::TimedOut => "TimedOut",
            ExecutionStatus::ContinuedAsNew => "ContinuedAsNew",
        }
    }

    /// Long engine form (`WORKFLOW_EXECUTION_STATUS_*`).
    pub fn engine_name(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "WORKFLOW_EXECUTION_STATUS_RUNNING",
            ExecutionStatus::Completed => "WORKFLOW_EXECUTION_STATUS_COMPLETED",
            ExecutionStatus::Failed => "WORKFLOW_EXECUTION_STATUS_FAILED",
            ExecutionStatus::Canceled => "WORKFLOW_EXECUTION_STATUS_CANCELED",
            ExecutionStatus::Terminated => "WORKFLOW_EXECUTION_STATUS_TERMINATED",
            ExecutionStatus::TimedOut => "WORKFLOW_EXECUTION_STATUS_TIMED_OUT",
            ExecutionStatus::ContinuedAsNew => "WORKFLOW_EXECUTION_STATUS_CONTINUED_AS_NEW",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses both the engine's long form and the short names, ignoring case
/// and separators (`TIMED_OUT`, `TimedOut`, `timed_out`).
impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let short = trimmed
            .strip_prefix("WORKFLOW_EXECUTION_STATUS_")
            .unwrap_or(trimmed);
        let normalized: String = short
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            "canceled" | "cancelled" => Ok(ExecutionStatus::Canceled),
            "terminated" => Ok(ExecutionStatus::Terminated),
            "timedout" => Ok(ExecutionStatus::TimedOut),
            "continuedasnew" => Ok(ExecutionStatus::ContinuedAsNew),
            _ => Err(format!("unknown execution status '{}'", s)),
        }
    }
}

/// A signal to deliver to one execution.
///
/// `request_id` is generated once and reused across retries so the engine
/// can deduplicate a repeated delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRequest {
    /// Target workflow ID.
    pub workflow_id: String,
    /// Signal channel name.
    pub signal_name: String,
    /// Signal input.
    pub input: Value,
    /// Idempotency key for this delivery.
    pub request_id: String,
}

impl SignalRequest {
    /// Create a new signal request with a fresh request ID.
    pub fn new(
        workflow_id: impl Into<String>,
        signal_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            signal_name: signal_name.into(),
            input,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Override the request ID.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// Options for listing executions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListExecutionsOptions {
    /// Engine query expression, passed through untouched.
    pub query: Option<String>,
    /// Maximum number of records in this page.
    pub page_size: u32,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
}

impl ListExecutionsOptions {
    /// Create options for the first page.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Set the query expression.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the continuation token.
    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }
}

/// One page of raw execution records.
///
/// Pages are forward-only; a page cannot be re-read except by listing again
/// with the token that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPage {
    /// Records in engine order.
    pub executions: Vec<RawExecution>,
    /// Token for the next page; `None` when exhausted.
    pub next_page_token: Option<String>,
}

/// An execution record exactly as the engine returned it.
///
/// Records stay untyped so a single malformed entry does not fail the page
/// it arrived in. Accessors return `None` for missing or mistyped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawExecution(pub Value);

impl RawExecution {
    /// Workflow ID (`execution.workflowId`).
    pub fn workflow_id(&self) -> Option<&str> {
        self.0.pointer("/execution/workflowId")?.as_str()
    }

    /// Run ID (`execution.runId`).
    pub fn run_id(&self) -> Option<&str> {
        self.0.pointer("/execution/runId")?.as_str()
    }

    /// Workflow type name (`type.name`).
    pub fn workflow_type(&self) -> Option<&str> {
        self.0.pointer("/type/name")?.as_str()
    }

    /// Raw status string.
    pub fn status(&self) -> Option<&str> {
        self.0.get("status")?.as_str()
    }

    /// Start time (RFC 3339).
    pub fn start_time(&self) -> Option<&str> {
        self.0.get("startTime")?.as_str()
    }

    /// Close time (RFC 3339), absent while running.
    pub fn close_time(&self) -> Option<&str> {
        self.0.get("closeTime")?.as_str()
    }

    /// Build a well-formed record. Used by the mock engine and tests.
    pub fn build(
        workflow_id: &str,
        run_id: &str,
        workflow_type: &str,
        status: ExecutionStatus,
        start_time: &str,
        close_time: Option<&str>,
    ) -> Self {
        let mut record = serde_json::json!({
            "execution": { "workflowId": workflow_id, "runId": run_id },
            "type": { "name": workflow_type },
            "status": status.engine_name(),
            "startTime": start_time,
        });
        if let Some(close) = close_time {
            record["closeTime"] = Value::String(close.to_string());
        }
        RawExecution(record)
    }
}
