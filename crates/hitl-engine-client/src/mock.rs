// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory engine for testing.
//!
//! Simulates signal delivery, paged listing, and connectivity without a
//! network. Calls are counted so tests can assert that no engine round-trip
//! happened.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::EngineClient;
use crate::error::{EngineError, Result};
use crate::types::{
    ExecutionPage, ExecutionStatus, ListExecutionsOptions, RawExecution, SignalRequest,
};

#[derive(Debug, Default)]
struct MockState {
    records: Vec<RawExecution>,
    delivered: Vec<SignalRequest>,
    signal_failures: VecDeque<EngineError>,
    forced_error: Option<EngineError>,
    connectivity_delay: Duration,
    last_list: Option<ListExecutionsOptions>,
}

/// Mock engine for testing.
#[derive(Debug, Default)]
pub struct MockEngine {
    state: Mutex<MockState>,
    signal_calls: AtomicUsize,
    list_calls: AtomicUsize,
    describe_calls: AtomicUsize,
    connectivity_calls: AtomicUsize,
}

impl MockEngine {
    /// Create an empty mock engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock engine where every call fails as unreachable.
    pub fn unreachable() -> Self {
        Self {
            state: Mutex::new(MockState {
                forced_error: Some(EngineError::Unavailable("connection refused".to_string())),
                ..MockState::default()
            }),
            ..Self::default()
        }
    }

    /// Add an execution in the given status.
    pub async fn add_execution(&self, workflow_id: &str, status: ExecutionStatus) {
        let mut state = self.state.lock().await;
        let index = state.records.len();
        let close_time = status.is_terminal().then_some("2025-01-01T01:00:00Z");
        state.records.push(RawExecution::build(
            workflow_id,
            &format!("run-{}", index),
            "ApprovalWorkflow",
            status,
            "2025-01-01T00:00:00Z",
            close_time,
        ));
    }

    /// Add `count` running executions named `{prefix}-{n}`.
    pub async fn add_running(&self, prefix: &str, count: usize) {
        for n in 0..count {
            self.add_execution(&format!("{}-{}", prefix, n), ExecutionStatus::Running)
                .await;
        }
    }

    /// Add a record verbatim, well-formed or not.
    pub async fn add_raw_record(&self, record: Value) {
        self.state.lock().await.records.push(RawExecution(record));
    }

    /// Change the status of an existing execution.
    pub async fn set_status(&self, workflow_id: &str, status: ExecutionStatus) {
        let mut state = self.state.lock().await;
        for record in state.records.iter_mut() {
            if record.workflow_id() == Some(workflow_id) {
                record.0["status"] = Value::String(status.engine_name().to_string());
            }
        }
    }

    /// Make every subsequent call fail with `error` (`None` restores normal behaviour).
    pub async fn set_forced_error(&self, error: Option<EngineError>) {
        self.state.lock().await.forced_error = error;
    }

    /// Queue failures returned by the next signal calls, in order.
    pub async fn fail_next_signals(&self, errors: Vec<EngineError>) {
        self.state.lock().await.signal_failures.extend(errors);
    }

    /// Delay connectivity checks by `delay`.
    pub async fn set_connectivity_delay(&self, delay: Duration) {
        self.state.lock().await.connectivity_delay = delay;
    }

    /// Signals the engine accepted.
    pub async fn delivered_signals(&self) -> Vec<SignalRequest> {
        self.state.lock().await.delivered.clone()
    }

    /// Options of the most recent list call.
    pub async fn last_list_options(&self) -> Option<ListExecutionsOptions> {
        self.state.lock().await.last_list.clone()
    }

    /// Number of `signal_execution` calls made.
    pub fn signal_calls(&self) -> usize {
        self.signal_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_executions` calls made.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `describe_execution` calls made.
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    /// Number of `check_connectivity` calls made.
    pub fn connectivity_calls(&self) -> usize {
        self.connectivity_calls.load(Ordering::SeqCst)
    }

    /// Total engine calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.signal_calls() + self.list_calls() + self.describe_calls() + self.connectivity_calls()
    }
}

fn encode_offset(offset: usize) -> String {
    STANDARD.encode(offset.to_string())
}

fn decode_offset(token: &str) -> Result<usize> {
    STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| EngineError::Rejected(format!("invalid page token '{}'", token)))
}

#[async_trait]
impl EngineClient for MockEngine {
    async fn signal_execution(&self, request: &SignalRequest) -> Result<()> {
        self.signal_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;

        if let Some(err) = state.forced_error.clone() {
            return Err(err);
        }
        if let Some(err) = state.signal_failures.pop_front() {
            return Err(err);
        }

        let status = state
            .records
            .iter()
            .rev()
            .find(|r| r.workflow_id() == Some(request.workflow_id.as_str()))
            .and_then(|r| r.status())
            .map(|s| s.parse::<ExecutionStatus>());

        match status {
            None => Err(EngineError::NotFound(request.workflow_id.clone())),
            Some(Ok(status)) if status.is_terminal() => {
                Err(EngineError::AlreadyCompleted(request.workflow_id.clone()))
            }
            Some(_) => {
                state.delivered.push(request.clone());
                Ok(())
            }
        }
    }

    async fn list_executions(&self, options: &ListExecutionsOptions) -> Result<ExecutionPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        state.last_list = Some(options.clone());

        if let Some(err) = state.forced_error.clone() {
            return Err(err);
        }

        let offset = match options.page_token.as_deref() {
            Some(token) => decode_offset(token)?,
            None => 0,
        };
        let page_size = options.page_size.max(1) as usize;
        let end = (offset + page_size).min(state.records.len());
        let start = offset.min(end);

        let executions = state.records[start..end].to_vec();
        let next_page_token = (end < state.records.len()).then(|| encode_offset(end));

        Ok(ExecutionPage {
            executions,
            next_page_token,
        })
    }

    async fn describe_execution(&self, workflow_id: &str) -> Result<RawExecution> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;

        if let Some(err) = state.forced_error.clone() {
            return Err(err);
        }

        state
            .records
            .iter()
            .rev()
            .find(|r| r.workflow_id() == Some(workflow_id))
            .cloned()
            .ok_or_else(|| EngineError::NotFound(workflow_id.to_string()))
    }

    async fn check_connectivity(&self) -> Result<Duration> {
        self.connectivity_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, forced) = {
            let state = self.state.lock().await;
            (state.connectivity_delay, state.forced_error.clone())
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match forced {
            Some(err) => Err(err),
            None => Ok(delay),
        }
    }
}
