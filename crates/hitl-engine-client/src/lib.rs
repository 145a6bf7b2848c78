// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HITL Engine Client
//!
//! Thin capability wrapper around the workflow engine's HTTP gateway. It is
//! the only place that talks to the engine; every failure is classified into
//! an [`EngineError`] kind before it leaves this crate.
//!
//! # Operations
//!
//! | Operation | Engine call |
//! |-----------|-------------|
//! | `signal_execution` | `POST /api/v1/namespaces/{ns}/workflows/{id}/signal/{name}` |
//! | `list_executions` | `GET /api/v1/namespaces/{ns}/workflows` |
//! | `describe_execution` | `GET /api/v1/namespaces/{ns}/workflows/{id}` |
//! | `check_connectivity` | `GET /api/v1/system-info` |
//!
//! Transient failures (`Unavailable`, `Timeout`) are retried a bounded number
//! of times with exponential backoff. Everything else is returned at once.
//!
//! # Example
//!
//! ```no_run
//! use hitl_engine_client::{EngineClient, EngineConfig, HttpEngineClient, SignalRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpEngineClient::new(
//!     EngineConfig::new().with_base_url("http://localhost:7243"),
//! )?;
//!
//! client.check_connectivity().await?;
//!
//! let signal = SignalRequest::new(
//!     "wf-123",
//!     "decision",
//!     serde_json::json!({"decision": "approved"}),
//! );
//! client.signal_execution(&signal).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod mock;
mod types;

pub use client::{EngineClient, HttpEngineClient};
pub use config::{EngineConfig, MAX_RETRIES_LIMIT};
pub use error::{EngineError, Result};
pub use mock::MockEngine;
pub use types::{ExecutionPage, ExecutionStatus, ListExecutionsOptions, RawExecution, SignalRequest};
