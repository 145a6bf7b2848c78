// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engine client trait and its HTTP implementation.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::types::{ExecutionPage, ListExecutionsOptions, RawExecution, SignalRequest};

/// Narrow capability the bridge needs from the workflow engine.
///
/// Implementations must be safe for concurrent use: a single instance is
/// shared by every in-flight request.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Deliver a signal to a running execution.
    ///
    /// `Ok(())` means the engine accepted the signal.
    async fn signal_execution(&self, request: &SignalRequest) -> Result<()>;

    /// Fetch one page of execution records matching the query.
    async fn list_executions(&self, options: &ListExecutionsOptions) -> Result<ExecutionPage>;

    /// Fetch the record of a single execution.
    async fn describe_execution(&self, workflow_id: &str) -> Result<RawExecution>;

    /// Probe the engine, returning the round-trip latency.
    async fn check_connectivity(&self) -> Result<Duration>;
}

/// Error body returned by the engine gateway.
#[derive(Debug, Default, Deserialize)]
struct EngineStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// gRPC status codes the gateway reports in error bodies.
const CODE_INVALID_ARGUMENT: i32 = 3;
const CODE_NOT_FOUND: i32 = 5;
const CODE_FAILED_PRECONDITION: i32 = 9;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListExecutionsResponse {
    #[serde(default)]
    executions: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeExecutionResponse {
    workflow_execution_info: Value,
}

/// Map an engine error response to a classified error.
///
/// The gRPC code in the body takes precedence over the HTTP status when both
/// are present.
fn classify(status: StatusCode, body: EngineStatus, subject: &str) -> EngineError {
    let message = body.message.to_lowercase();

    if body.code == CODE_NOT_FOUND || (body.code == 0 && status == StatusCode::NOT_FOUND) {
        if message.contains("already completed") {
            return EngineError::AlreadyCompleted(subject.to_string());
        }
        return EngineError::NotFound(subject.to_string());
    }

    if body.code == CODE_FAILED_PRECONDITION
        || (body.code == 0
            && (status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED))
    {
        return EngineError::AlreadyCompleted(subject.to_string());
    }

    if body.code == CODE_INVALID_ARGUMENT || (body.code == 0 && status == StatusCode::BAD_REQUEST)
    {
        let detail = if body.message.is_empty() {
            format!("engine rejected request for {}", subject)
        } else {
            body.message
        };
        return EngineError::Rejected(detail);
    }

    EngineError::Unavailable(format!("engine returned HTTP {}", status.as_u16()))
}

/// Engine client speaking the engine's HTTP/JSON gateway.
///
/// Holds one connection pool for the lifetime of the process; cloning the
/// inner `reqwest::Client` shares that pool.
pub struct HttpEngineClient {
    http: reqwest::Client,
    base_url: Url,
    config: EngineConfig,
}

impl HttpEngineClient {
    /// Create a new client with the given configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| EngineError::Config(format!("invalid engine URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::Config(format!(
                "engine URL cannot be used as a base: {}",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Build `{base}/api/v1/{segments...}`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Config("engine URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    /// Build a URL under the configured namespace's workflows collection.
    fn workflows_url(&self, segments: &[&str]) -> Result<Url> {
        let mut all = vec!["namespaces", self.config.namespace.as_str(), "workflows"];
        all.extend_from_slice(segments);
        self.url(&all)
    }

    fn transport_error(&self, err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout(self.config.request_timeout.as_millis() as u64)
        } else if err.is_decode() {
            EngineError::Unavailable(format!("malformed engine response: {}", err))
        } else {
            EngineError::Unavailable(format!("transport failure: {}", err.without_url()))
        }
    }

    /// Turn a non-success response into a classified error.
    async fn error_from_response(&self, response: reqwest::Response, subject: &str) -> EngineError {
        let status = response.status();
        let body = response
            .json::<EngineStatus>()
            .await
            .unwrap_or_default();
        classify(status, body, subject)
    }

    /// Run `attempt` with the bounded retry policy.
    ///
    /// Only retryable errors are retried; the delay doubles after each retry.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0u32;
        loop {
            match attempt().await {
                Err(err) if err.is_retryable() && retries < self.config.max_retries => {
                    let delay = self.config.retry_backoff * 2u32.saturating_pow(retries);
                    retries += 1;
                    warn!(
                        operation,
                        retry = retries,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Engine call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn signal_once(&self, url: &Url, request: &SignalRequest) -> Result<()> {
        let body = json!({
            "signalName": request.signal_name,
            "input": request.input,
            "identity": self.config.identity,
            "requestId": request.request_id,
        });

        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self
                .error_from_response(response, &request.workflow_id)
                .await)
        }
    }

    async fn list_once(&self, url: &Url, options: &ListExecutionsOptions) -> Result<ExecutionPage> {
        let mut params: Vec<(&str, String)> = vec![("pageSize", options.page_size.to_string())];
        if let Some(query) = options.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("query", query.to_string()));
        }
        if let Some(token) = options.page_token.as_deref().filter(|t| !t.is_empty()) {
            params.push(("nextPageToken", token.to_string()));
        }

        let response = self
            .http
            .get(url.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, "list executions").await);
        }

        let body: ListExecutionsResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(ExecutionPage {
            executions: body.executions.into_iter().map(RawExecution).collect(),
            next_page_token: body.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn describe_once(&self, url: &Url, workflow_id: &str) -> Result<RawExecution> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, workflow_id).await);
        }

        let body: DescribeExecutionResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(RawExecution(body.workflow_execution_info))
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    #[instrument(skip(self, request), fields(workflow_id = %request.workflow_id, signal_name = %request.signal_name))]
    async fn signal_execution(&self, request: &SignalRequest) -> Result<()> {
        info!(request_id = %request.request_id, "Signalling workflow execution");

        let url = self.workflows_url(&[
            request.workflow_id.as_str(),
            "signal",
            request.signal_name.as_str(),
        ])?;

        self.with_retry("signal_execution", || self.signal_once(&url, request))
            .await
    }

    #[instrument(skip(self, options), fields(page_size = options.page_size))]
    async fn list_executions(&self, options: &ListExecutionsOptions) -> Result<ExecutionPage> {
        debug!("Listing workflow executions");

        let url = self.workflows_url(&[])?;
        self.with_retry("list_executions", || self.list_once(&url, options))
            .await
    }

    #[instrument(skip(self), fields(workflow_id = %workflow_id))]
    async fn describe_execution(&self, workflow_id: &str) -> Result<RawExecution> {
        debug!("Describing workflow execution");

        let url = self.workflows_url(&[workflow_id])?;
        self.with_retry("describe_execution", || self.describe_once(&url, workflow_id))
            .await
    }

    #[instrument(skip(self))]
    async fn check_connectivity(&self) -> Result<Duration> {
        let url = self.url(&["system-info"])?;
        let timeout = self.config.health_timeout;
        let started = Instant::now();

        let response = tokio::time::timeout(timeout, self.http.get(url).timeout(timeout).send())
            .await
            .map_err(|_| EngineError::Timeout(timeout.as_millis() as u64))?
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(timeout.as_millis() as u64)
                } else {
                    EngineError::Unavailable(format!("transport failure: {}", e.without_url()))
                }
            })?;

        if !response.status().is_success() {
            return Err(EngineError::Unavailable(format!(
                "engine health endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let latency = started.elapsed();
        debug!(latency_ms = latency.as_millis() as u64, "Engine reachable");
        Ok(latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: i32, message: &str) -> EngineStatus {
        EngineStatus {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify(
            StatusCode::NOT_FOUND,
            status(5, "workflow not found for ID: wf-1"),
            "wf-1",
        );
        assert_eq!(err, EngineError::NotFound("wf-1".to_string()));
    }

    #[test]
    fn test_classify_completed_reported_as_not_found() {
        let err = classify(
            StatusCode::NOT_FOUND,
            status(5, "workflow execution already completed"),
            "wf-1",
        );
        assert_eq!(err, EngineError::AlreadyCompleted("wf-1".to_string()));
    }

    #[test]
    fn test_classify_by_http_status_without_body() {
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, EngineStatus::default(), "wf"),
            EngineError::NotFound(_)
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, EngineStatus::default(), "wf"),
            EngineError::AlreadyCompleted(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, EngineStatus::default(), "wf"),
            EngineError::Rejected(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, EngineStatus::default(), "wf"),
            EngineError::Unavailable(_)
        ));
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, EngineStatus::default(), "wf"),
            EngineError::Unavailable(_)
        ));
    }

    #[test]
    fn test_classify_code_wins_over_http_status() {
        let err = classify(
            StatusCode::INTERNAL_SERVER_ERROR,
            status(9, "precondition failed"),
            "wf",
        );
        assert!(matches!(err, EngineError::AlreadyCompleted(_)));

        let err = classify(StatusCode::OK, status(3, "invalid query"), "list");
        assert_eq!(err, EngineError::Rejected("invalid query".to_string()));
    }

    #[test]
    fn test_unavailable_message_hides_engine_text() {
        let err = classify(
            StatusCode::INTERNAL_SERVER_ERROR,
            status(13, "panic at shard 4 stack trace ..."),
            "wf",
        );
        assert_eq!(
            err,
            EngineError::Unavailable("engine returned HTTP 500".to_string())
        );
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = HttpEngineClient::new(
            EngineConfig::new()
                .with_base_url("http://engine:7243/gateway/")
                .with_namespace("ns one"),
        )
        .unwrap();
        let url = client.workflows_url(&["wf/1", "signal", "decision"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://engine:7243/gateway/api/v1/namespaces/ns%20one/workflows/wf%2F1/signal/decision"
        );
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = HttpEngineClient::new(EngineConfig::new().with_base_url("not a url"));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
