// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Signal dispatch.
//!
//! Turns a decision request into exactly one engine signal call and maps the
//! classified outcome onto a [`SignalResult`]. Invalid requests never reach
//! the engine. The dispatcher never retries or queues a signal on its own;
//! bounded retries belong to the engine client.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use hitl_engine_client::{EngineClient, EngineError, SignalRequest};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::observer::{DispatchEvent, DispatchObserver};
use crate::validator::{DecisionRequest, DecisionValidator, ValidationError};

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum SignalStatus {
    /// The engine accepted the signal.
    Delivered,
    /// No execution with this workflow ID exists.
    NotFound,
    /// The execution already reached a terminal state.
    AlreadyCompleted,
    /// The request was malformed; the engine was not called, or refused it.
    InvalidSignal,
    /// The engine could not be reached. Retrying later may succeed.
    EngineUnavailable,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Delivered => "Delivered",
            SignalStatus::NotFound => "NotFound",
            SignalStatus::AlreadyCompleted => "AlreadyCompleted",
            SignalStatus::InvalidSignal => "InvalidSignal",
            SignalStatus::EngineUnavailable => "EngineUnavailable",
        }
    }
}

/// Result returned to the caller of `POST /decision`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignalResult {
    /// Classified outcome.
    pub status: SignalStatus,
    /// Workflow ID as understood by the bridge (empty if unreadable).
    pub workflow_id: String,
    /// Signal channel the decision was sent on.
    pub signal_name: String,
    /// Human-readable detail for non-delivered outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the outcome was determined.
    pub timestamp: DateTime<Utc>,
}

impl SignalResult {
    fn new(
        status: SignalStatus,
        workflow_id: impl Into<String>,
        signal_name: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            status,
            workflow_id: workflow_id.into(),
            signal_name: signal_name.into(),
            message,
            timestamp: Utc::now(),
        }
    }

    fn from_engine(request: &DecisionRequest, outcome: Result<(), EngineError>) -> Self {
        let (status, message) = match outcome {
            Ok(()) => (SignalStatus::Delivered, None),
            Err(EngineError::NotFound(_)) => (
                SignalStatus::NotFound,
                Some("no workflow execution with this ID".to_string()),
            ),
            Err(EngineError::AlreadyCompleted(_)) => (
                SignalStatus::AlreadyCompleted,
                Some("workflow execution has already completed".to_string()),
            ),
            Err(EngineError::Rejected(_)) => (
                SignalStatus::InvalidSignal,
                Some("engine rejected the signal".to_string()),
            ),
            Err(EngineError::Timeout(ms)) => (
                SignalStatus::EngineUnavailable,
                Some(format!("engine did not respond within {} ms", ms)),
            ),
            Err(EngineError::Unavailable(_) | EngineError::Config(_)) => (
                SignalStatus::EngineUnavailable,
                Some("engine unavailable".to_string()),
            ),
        };
        Self::new(
            status,
            request.workflow_id.as_str(),
            request.signal_name.as_str(),
            message,
        )
    }

    fn invalid(err: &ValidationError, default_signal: &str) -> Self {
        Self::new(
            SignalStatus::InvalidSignal,
            err.workflow_id.clone().unwrap_or_default(),
            err.signal_name.as_deref().unwrap_or(default_signal),
            Some(err.to_string()),
        )
    }
}

/// Validates decision requests and delivers them as engine signals.
#[derive(Clone)]
pub struct SignalDispatcher {
    engine: Arc<dyn EngineClient>,
    validator: DecisionValidator,
    observer: Arc<dyn DispatchObserver>,
}

impl SignalDispatcher {
    /// Create a new dispatcher.
    pub fn new(
        engine: Arc<dyn EngineClient>,
        validator: DecisionValidator,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            engine,
            validator,
            observer,
        }
    }

    /// Dispatch a raw JSON decision body.
    ///
    /// The engine call runs in its own task. If the caller stops waiting
    /// (for example the HTTP client disconnects) the delivery still completes
    /// and is still observed.
    pub async fn dispatch(&self, body: &[u8]) -> SignalResult {
        let started = Instant::now();
        match self.validator.validate_bytes(body) {
            Ok(request) => self.dispatch_request(request).await,
            Err(err) => {
                let result = SignalResult::invalid(&err, self.validator.default_signal());
                self.observe(&result, started);
                result
            }
        }
    }

    /// Dispatch an already validated request.
    pub async fn dispatch_request(&self, request: DecisionRequest) -> SignalResult {
        let started = Instant::now();
        let engine = self.engine.clone();
        let observer = self.observer.clone();
        let workflow_id = request.workflow_id.clone();
        let signal_name = request.signal_name.clone();

        let task = tokio::spawn(async move {
            let outcome = match serde_json::to_value(&request.payload) {
                Ok(input) => {
                    let signal = SignalRequest::new(
                        request.workflow_id.as_str(),
                        request.signal_name.as_str(),
                        input,
                    );
                    engine.signal_execution(&signal).await
                }
                Err(e) => Err(EngineError::Rejected(e.to_string())),
            };
            let result = SignalResult::from_engine(&request, outcome);
            observer.on_dispatch(&event(&result, started));
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(workflow_id = %workflow_id, error = %e, "Signal dispatch task failed");
                let result = SignalResult::new(
                    SignalStatus::EngineUnavailable,
                    workflow_id,
                    signal_name,
                    Some("signal dispatch aborted".to_string()),
                );
                self.observe(&result, started);
                result
            }
        }
    }

    fn observe(&self, result: &SignalResult, started: Instant) {
        self.observer.on_dispatch(&event(result, started));
    }
}

fn event(result: &SignalResult, started: Instant) -> DispatchEvent {
    DispatchEvent {
        workflow_id: result.workflow_id.clone(),
        signal_name: result.signal_name.clone(),
        status: result.status,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::DispatchCounters;
    use hitl_engine_client::{ExecutionStatus, MockEngine};
    use serde_json::json;

    fn dispatcher(engine: Arc<MockEngine>, counters: Arc<DispatchCounters>) -> SignalDispatcher {
        let validator = DecisionValidator::new(
            "decision",
            &["approved".to_string(), "rejected".to_string()],
        );
        SignalDispatcher::new(engine, validator, counters)
    }

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_delivered() {
        let engine = Arc::new(MockEngine::new());
        engine.add_execution("wf-123", ExecutionStatus::Running).await;
        let counters = Arc::new(DispatchCounters::new());

        let result = dispatcher(engine.clone(), counters.clone())
            .dispatch(&body(json!({
                "workflowId": "wf-123",
                "payload": {"decision": "Approved", "comment": "ok"}
            })))
            .await;

        assert_eq!(result.status, SignalStatus::Delivered);
        assert_eq!(result.workflow_id, "wf-123");
        assert_eq!(result.signal_name, "decision");
        assert!(result.message.is_none());

        let delivered = engine.delivered_signals().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].signal_name, "decision");
        assert_eq!(
            delivered[0].input,
            json!({"decision": "approved", "comment": "ok"})
        );
        assert_eq!(counters.get(SignalStatus::Delivered), 1);
    }

    #[tokio::test]
    async fn test_invalid_requests_never_call_engine() {
        let engine = Arc::new(MockEngine::new());
        engine.add_execution("wf-1", ExecutionStatus::Running).await;
        let counters = Arc::new(DispatchCounters::new());
        let dispatcher = dispatcher(engine.clone(), counters.clone());

        let bodies: Vec<Vec<u8>> = vec![
            b"not json".to_vec(),
            b"[]".to_vec(),
            body(json!({})),
            body(json!({"workflowId": "", "payload": {"decision": "approved"}})),
            body(json!({"workflowId": "wf 1", "payload": {"decision": "approved"}})),
            body(json!({"workflowId": "wf-1"})),
            body(json!({"workflowId": "wf-1", "payload": {}})),
            body(json!({"workflowId": "wf-1", "payload": {"decision": "maybe"}})),
            body(json!({"workflowId": "wf-1", "signalName": "has space", "payload": {"decision": "approved"}})),
        ];
        let attempts = bodies.len() as u64;

        for raw in bodies {
            let result = dispatcher.dispatch(&raw).await;
            assert_eq!(result.status, SignalStatus::InvalidSignal);
            assert!(result.message.is_some());
        }

        assert_eq!(engine.total_calls(), 0);
        assert_eq!(counters.get(SignalStatus::InvalidSignal), attempts);
    }

    #[tokio::test]
    async fn test_unreadable_body_echoes_empty_workflow_id() {
        let engine = Arc::new(MockEngine::new());
        let result = dispatcher(engine, Arc::new(DispatchCounters::new()))
            .dispatch(b"{")
            .await;
        assert_eq!(result.status, SignalStatus::InvalidSignal);
        assert_eq!(result.workflow_id, "");
        assert_eq!(result.signal_name, "decision");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (None, SignalStatus::Delivered),
            (Some(EngineError::NotFound("wf-1".into())), SignalStatus::NotFound),
            (
                Some(EngineError::AlreadyCompleted("wf-1".into())),
                SignalStatus::AlreadyCompleted,
            ),
            (
                Some(EngineError::Unavailable("connection reset".into())),
                SignalStatus::EngineUnavailable,
            ),
            (Some(EngineError::Timeout(5000)), SignalStatus::EngineUnavailable),
            (
                Some(EngineError::Rejected("input too large".into())),
                SignalStatus::InvalidSignal,
            ),
        ];

        for (failure, expected) in cases {
            let engine = Arc::new(MockEngine::new());
            engine.add_execution("wf-1", ExecutionStatus::Running).await;
            if let Some(err) = failure {
                engine.fail_next_signals(vec![err]).await;
            }
            let counters = Arc::new(DispatchCounters::new());

            let result = dispatcher(engine.clone(), counters.clone())
                .dispatch(&body(json!({"workflowId": "wf-1", "payload": {"decision": "rejected"}})))
                .await;

            assert_eq!(result.status, expected);
            assert_eq!(engine.signal_calls(), 1, "exactly one engine call for {:?}", expected);
            assert_eq!(counters.snapshot().total(), 1);
        }
    }

    #[tokio::test]
    async fn test_engine_internals_are_not_echoed() {
        let engine = Arc::new(MockEngine::new());
        engine
            .fail_next_signals(vec![EngineError::Unavailable(
                "dial tcp 10.0.0.7:7233: connect: connection refused".into(),
            )])
            .await;

        let result = dispatcher(engine, Arc::new(DispatchCounters::new()))
            .dispatch(&body(json!({"workflowId": "wf-1", "payload": {"decision": "approved"}})))
            .await;

        assert_eq!(result.status, SignalStatus::EngineUnavailable);
        assert!(!result.message.unwrap().contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_terminal_execution_is_already_completed() {
        let engine = Arc::new(MockEngine::new());
        engine.add_execution("wf-done", ExecutionStatus::Completed).await;

        let result = dispatcher(engine.clone(), Arc::new(DispatchCounters::new()))
            .dispatch(&body(json!({"workflowId": "wf-done", "payload": {"decision": "approved"}})))
            .await;

        assert_eq!(result.status, SignalStatus::AlreadyCompleted);
        assert!(engine.delivered_signals().await.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_survives_dropped_waiter() {
        let engine = Arc::new(MockEngine::new());
        engine.add_execution("wf-1", ExecutionStatus::Running).await;
        let counters = Arc::new(DispatchCounters::new());
        let dispatcher = dispatcher(engine.clone(), counters.clone());

        let raw = body(json!({"workflowId": "wf-1", "payload": {"decision": "approved"}}));
        {
            // Poll once so the engine task is spawned, then drop the waiter.
            let fut = dispatcher.dispatch(&raw);
            tokio::pin!(fut);
            let _ = poll_once(fut.as_mut()).await;
        }

        for _ in 0..50 {
            if counters.snapshot().total() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(counters.get(SignalStatus::Delivered), 1);
        assert_eq!(engine.delivered_signals().await.len(), 1);
    }

    async fn poll_once<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
        tokio::time::timeout(std::time::Duration::ZERO, fut).await.ok()
    }

    #[test]
    fn test_result_serialization() {
        let result = SignalResult::new(SignalStatus::NotFound, "wf-123", "decision", None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "NotFound");
        assert_eq!(json["workflowId"], "wf-123");
        assert_eq!(json["signalName"], "decision");
        assert!(json.get("message").is_none());
        assert!(json.get("timestamp").is_some());
    }
}
