// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for hitl-bridge.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use hitl_engine_client::{EngineConfig, EngineError};

use crate::health::HealthMonitorConfig;

/// Signal channel used when a decision request names none.
pub const DEFAULT_SIGNAL_NAME: &str = "decision";

/// Decisions accepted when none are configured.
pub const DEFAULT_ALLOWED_DECISIONS: &[&str] = &["approved", "rejected", "escalated"];

/// Pagination limits for workflow listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Page size used when the caller gives none.
    pub default_page_size: u32,
    /// Largest page size ever sent to the engine.
    pub max_page_size: u32,
    /// Maximum filter expression length in bytes.
    pub max_filter_len: usize,
    /// Maximum page token length in bytes.
    pub max_page_token_len: usize,
    /// Reject out-of-range page sizes instead of clamping them.
    pub strict: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            max_filter_len: 2048,
            max_page_token_len: 4096,
            strict: false,
        }
    }
}

/// Bridge configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address.
    pub bind_addr: SocketAddr,
    /// Engine connection settings.
    pub engine: EngineConfig,
    /// Signal channel used when a request names none.
    pub default_signal: String,
    /// Accepted `payload.decision` values (lower case).
    pub allowed_decisions: Vec<String>,
    /// Listing limits.
    pub pagination: PaginationConfig,
    /// Health monitor settings.
    pub health: HealthMonitorConfig,
    /// Connectivity attempts before startup gives up.
    pub startup_attempts: u32,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            engine: EngineConfig::default(),
            default_signal: DEFAULT_SIGNAL_NAME.to_string(),
            allowed_decisions: DEFAULT_ALLOWED_DECISIONS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            pagination: PaginationConfig::default(),
            health: HealthMonitorConfig::default(),
            startup_attempts: 5,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = env_parse("HITL_BIND_ADDR", defaults.bind_addr)?;
        let engine = EngineConfig::from_env()?;

        let default_signal = std::env::var("HITL_DEFAULT_SIGNAL")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.default_signal);

        let allowed_decisions = match std::env::var("HITL_ALLOWED_DECISIONS") {
            Ok(raw) => split_list(&raw)
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
            Err(_) => defaults.allowed_decisions,
        };

        let pagination = PaginationConfig {
            default_page_size: env_parse("HITL_DEFAULT_PAGE_SIZE", 20)?,
            max_page_size: env_parse("HITL_MAX_PAGE_SIZE", 100)?,
            max_filter_len: env_parse("HITL_MAX_FILTER_LEN", 2048)?,
            max_page_token_len: defaults.pagination.max_page_token_len,
            strict: env_bool("HITL_STRICT_PAGINATION")?,
        };

        let health = HealthMonitorConfig {
            poll_interval: Duration::from_millis(env_parse(
                "HITL_HEALTH_POLL_INTERVAL_MS",
                30_000u64,
            )?),
            timeout: engine.health_timeout,
            degraded_latency: Duration::from_millis(env_parse(
                "HITL_DEGRADED_LATENCY_MS",
                1_000u64,
            )?),
        };

        let startup_attempts = env_parse("HITL_STARTUP_ATTEMPTS", defaults.startup_attempts)?;

        let allowed_origins = match std::env::var("HITL_ALLOWED_ORIGINS") {
            Ok(raw) => split_list(&raw),
            Err(_) => defaults.allowed_origins,
        };

        let config = Self {
            bind_addr,
            engine,
            default_signal,
            allowed_decisions,
            pagination,
            health,
            startup_attempts,
            allowed_origins,
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks on values that parsed but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_signal.is_empty() {
            return Err(invalid("HITL_DEFAULT_SIGNAL", "must not be empty"));
        }
        if self.allowed_decisions.is_empty() {
            return Err(invalid("HITL_ALLOWED_DECISIONS", "must list at least one decision"));
        }
        if self.pagination.max_page_size == 0 {
            return Err(invalid("HITL_MAX_PAGE_SIZE", "must be at least 1"));
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            return Err(invalid(
                "HITL_DEFAULT_PAGE_SIZE",
                "must be between 1 and HITL_MAX_PAGE_SIZE",
            ));
        }
        if self.pagination.max_filter_len == 0 {
            return Err(invalid("HITL_MAX_FILTER_LEN", "must be at least 1"));
        }
        if self.health.poll_interval.is_zero() {
            return Err(invalid("HITL_HEALTH_POLL_INTERVAL_MS", "must be greater than zero"));
        }
        if self.startup_attempts == 0 {
            return Err(invalid("HITL_STARTUP_ATTEMPTS", "must be at least 1"));
        }
        Ok(())
    }

    /// Set the listen address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the engine connection. The health check timeout follows it.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.health.timeout = engine.health_timeout;
        self.engine = engine;
        self
    }

    /// Set the default signal channel.
    pub fn with_default_signal(mut self, signal: impl Into<String>) -> Self {
        self.default_signal = signal.into();
        self
    }

    /// Set the accepted decisions.
    pub fn with_allowed_decisions<I, S>(mut self, decisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_decisions = decisions
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Set listing limits.
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Reject out-of-range page sizes instead of clamping.
    pub fn with_strict_pagination(mut self, strict: bool) -> Self {
        self.pagination.strict = strict;
        self
    }

    /// Set health monitor settings.
    pub fn with_health(mut self, health: HealthMonitorConfig) -> Self {
        self.health = health;
        self
    }

    /// Set CORS origins.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but its value is unusable.
    #[error("Invalid value for {var}: {reason}")]
    Invalid {
        /// Environment variable name.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// Engine connection settings are invalid.
    #[error("Engine configuration error: {0}")]
    Engine(#[from] EngineError),
}

fn invalid(var: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

fn env_parse<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_bool(var: &'static str) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(ConfigError::Invalid {
                var,
                reason: format!("expected a boolean, got '{}'", other),
            }),
        },
        Err(_) => Ok(false),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
