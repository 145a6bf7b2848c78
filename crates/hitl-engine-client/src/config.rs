// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the engine client.

use std::time::Duration;

use crate::error::{EngineError, Result};

/// Upper bound for `max_retries`; retries are never unbounded.
pub const MAX_RETRIES_LIMIT: u32 = 5;

/// Configuration for the HttpEngineClient.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the engine's HTTP gateway.
    pub base_url: String,
    /// Engine namespace every call is scoped to.
    pub namespace: String,
    /// Identity reported to the engine on signals.
    pub identity: String,
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// Timeout for connectivity checks.
    pub health_timeout: Duration,
    /// Additional attempts after a transient failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7243".to_string(),
            namespace: "default".to_string(),
            identity: "hitl-bridge".to_string(),
            request_timeout: Duration::from_secs(5),
            health_timeout: Duration::from_secs(3),
            max_retries: 2,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HITL_ENGINE_URL`: Engine HTTP gateway (default: "http://localhost:7243")
    /// - `HITL_ENGINE_NAMESPACE`: Namespace (default: "default")
    /// - `HITL_ENGINE_IDENTITY`: Signal identity (default: "hitl-bridge")
    /// - `HITL_REQUEST_TIMEOUT_MS`: Per-attempt timeout in milliseconds (default: 5000)
    /// - `HITL_HEALTH_TIMEOUT_MS`: Connectivity check timeout in milliseconds (default: 3000)
    /// - `HITL_MAX_RETRIES`: Retries on transient failures, at most 5 (default: 2)
    /// - `HITL_RETRY_BACKOFF_MS`: Initial retry delay in milliseconds (default: 100)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let base_url = std::env::var("HITL_ENGINE_URL").unwrap_or(defaults.base_url);
        let namespace = std::env::var("HITL_ENGINE_NAMESPACE").unwrap_or(defaults.namespace);
        let identity = std::env::var("HITL_ENGINE_IDENTITY").unwrap_or(defaults.identity);

        let request_timeout_ms = env_millis("HITL_REQUEST_TIMEOUT_MS", 5000)?;
        let health_timeout_ms = env_millis("HITL_HEALTH_TIMEOUT_MS", 3000)?;
        let retry_backoff_ms = env_millis("HITL_RETRY_BACKOFF_MS", 100)?;

        let max_retries: u32 = std::env::var("HITL_MAX_RETRIES")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .map_err(|e| EngineError::Config(format!("invalid HITL_MAX_RETRIES: {}", e)))?;

        let config = Self {
            base_url,
            namespace,
            identity,
            request_timeout: Duration::from_millis(request_timeout_ms),
            health_timeout: Duration::from_millis(health_timeout_ms),
            max_retries,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks shared by `from_env` and `HttpEngineClient::new`.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(EngineError::Config("namespace must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() || self.health_timeout.is_zero() {
            return Err(EngineError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(EngineError::Config(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }
        Ok(())
    }

    /// Set the engine base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the identity reported on signals.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Set the per-attempt request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connectivity check timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Set the retry budget and initial backoff.
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }
}

fn env_millis(var: &'static str, default: u64) -> Result<u64> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|e| EngineError::Config(format!("invalid {}: {}", var, e))),
        Err(_) => Ok(default),
    }
}
