// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for hitl-engine-client.
//!
//! Every failure that crosses the engine boundary is classified into one of
//! these kinds before it reaches callers. Raw transport errors never leak.

use thiserror::Error;

/// Result type using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Classified engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// No execution with this workflow ID is known to the engine.
    #[error("workflow execution not found: {0}")]
    NotFound(String),

    /// The execution exists but has reached a terminal state.
    #[error("workflow execution already completed: {0}")]
    AlreadyCompleted(String),

    /// The engine refused the request as malformed.
    #[error("request rejected by engine: {0}")]
    Rejected(String),

    /// The engine could not be reached or answered with a server-side failure.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine did not answer within the configured timeout.
    #[error("engine request timed out after {0}ms")]
    Timeout(u64),
}

impl EngineError {
    /// Whether repeating the same call may succeed.
    ///
    /// Only connectivity failures qualify; resource-state and validation
    /// errors reflect real workflow state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Unavailable(_) | EngineError::Timeout(_))
    }

    /// Short machine-readable kind, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyCompleted(_) => "already_completed",
            EngineError::Rejected(_) => "rejected",
            EngineError::Unavailable(_) => "unavailable",
            EngineError::Timeout(_) => "timeout",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Unavailable(format!("malformed engine response: {}", err))
    }
}
