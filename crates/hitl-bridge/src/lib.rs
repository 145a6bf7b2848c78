// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HITL Bridge
//!
//! Stateless HTTP gateway between human reviewers and a durable workflow
//! engine. Reviewers post decisions that are delivered as signals to paused
//! workflow executions; callers list and look up executions; operators watch
//! engine connectivity.
//!
//! # Components
//!
//! - [`validator`]: structural validation of decision requests
//! - [`dispatcher`]: one engine signal per valid request, outcome mapping
//! - [`query`]: paginated listing and lookup of executions
//! - [`health`]: on-demand and periodic connectivity checks
//! - [`observer`]: per-dispatch events and counters
//!
//! All components share one [`hitl_engine_client::EngineClient`] handle
//! created at startup. The bridge keeps no state between requests.
//!
//! # Endpoints
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | `GET` | `/health` | engine connectivity, 503 when unreachable |
//! | `GET` | `/workflows` | one page of execution summaries |
//! | `GET` | `/workflows/{workflowId}` | one execution summary |
//! | `POST` | `/decision` | `SignalResult` |
//! | `GET` | `/docs` | Swagger UI |

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod observer;
pub mod query;
pub mod routes;
pub mod server;
pub mod state;
pub mod validator;

pub use config::{Config, ConfigError, PaginationConfig};
pub use dispatcher::{SignalDispatcher, SignalResult, SignalStatus};
pub use error::{ApiError, Error, ErrorResponse, Result};
pub use health::{HealthMonitor, HealthMonitorConfig, HealthState, HealthStatus};
pub use observer::{DispatchCounters, DispatchEvent, DispatchObserver, TracingObserver};
pub use query::{ListQuery, QueryError, WorkflowPage, WorkflowQueryService, WorkflowSummary};
pub use server::{Server, wait_for_engine};
pub use state::AppState;
pub use validator::{DecisionPayload, DecisionRequest, DecisionValidator, ValidationError};
