// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engine health monitoring.
//!
//! [`HealthMonitor::check`] probes engine connectivity on demand and always
//! produces a [`HealthStatus`]; connectivity failures are reported as data.
//! [`HealthMonitor::run`] refreshes the latest status in the background until
//! its shutdown handle is notified.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hitl_engine_client::EngineClient;
use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Composite engine connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum HealthState {
    /// Engine answered within the latency budget.
    Healthy,
    /// Engine answered, but slowly.
    Degraded,
    /// Engine did not answer, or answered with an error.
    Unreachable,
}

/// Result of one connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Connectivity state.
    pub status: HealthState,
    /// When the check finished.
    pub last_checked: DateTime<Utc>,
    /// Diagnostic detail for non-healthy states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    fn new(status: HealthState, message: Option<String>) -> Self {
        Self {
            status,
            last_checked: Utc::now(),
            message,
        }
    }
}

/// Configuration for the health monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthMonitorConfig {
    /// How often the background loop checks the engine.
    pub poll_interval: Duration,
    /// Upper bound on a single check.
    pub timeout: Duration,
    /// Latency above which a reachable engine counts as degraded.
    pub degraded_latency: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(3),
            degraded_latency: Duration::from_secs(1),
        }
    }
}

/// Probes the engine and keeps the latest result.
pub struct HealthMonitor {
    engine: Arc<dyn EngineClient>,
    config: HealthMonitorConfig,
    latest: RwLock<Option<HealthStatus>>,
    shutdown: Arc<Notify>,
}

impl HealthMonitor {
    /// Create a new health monitor.
    pub fn new(engine: Arc<dyn EngineClient>, config: HealthMonitorConfig) -> Self {
        Self {
            engine,
            config,
            latest: RwLock::new(None),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Monitor settings.
    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    /// Check engine connectivity now.
    ///
    /// Returns within `timeout` plus scheduling slack even if the engine
    /// client itself never answers.
    pub async fn check(&self) -> HealthStatus {
        let outcome = tokio::time::timeout(self.config.timeout, self.engine.check_connectivity()).await;

        let status = match outcome {
            Ok(Ok(latency)) if latency > self.config.degraded_latency => HealthStatus::new(
                HealthState::Degraded,
                Some(format!(
                    "engine responded in {} ms (threshold {} ms)",
                    latency.as_millis(),
                    self.config.degraded_latency.as_millis()
                )),
            ),
            Ok(Ok(latency)) => {
                debug!(latency_ms = latency.as_millis() as u64, "Engine healthy");
                HealthStatus::new(HealthState::Healthy, None)
            }
            Ok(Err(e)) => HealthStatus::new(HealthState::Unreachable, Some(e.to_string())),
            Err(_) => HealthStatus::new(
                HealthState::Unreachable,
                Some(format!(
                    "connectivity check timed out after {} ms",
                    self.config.timeout.as_millis()
                )),
            ),
        };

        if status.status != HealthState::Healthy {
            warn!(
                status = ?status.status,
                message = status.message.as_deref().unwrap_or_default(),
                "Engine health check not healthy"
            );
        }

        *self.latest.write().await = Some(status.clone());
        status
    }

    /// Most recent check result, if any check has run.
    pub async fn latest(&self) -> Option<HealthStatus> {
        self.latest.read().await.clone()
    }

    /// Latest status if it is younger than `poll_interval`, otherwise a fresh check.
    pub async fn current(&self) -> HealthStatus {
        if let Some(status) = self.latest().await {
            let age = Utc::now().signed_duration_since(status.last_checked);
            if age.to_std().is_ok_and(|age| age < self.config.poll_interval) {
                return status;
            }
        }
        self.check().await
    }

    /// Run the health check loop.
    ///
    /// Checks immediately, then every `poll_interval`. The loop exits when
    /// the shutdown signal is received.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Health monitor started"
        );

        self.check().await;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Health monitor received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.check().await;
                }
            }
        }

        info!("Health monitor stopped");
    }
}
