// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared application state.

use std::sync::Arc;

use hitl_engine_client::EngineClient;

use crate::config::Config;
use crate::dispatcher::SignalDispatcher;
use crate::health::HealthMonitor;
use crate::observer::{DispatchCounters, FanoutObserver, TracingObserver};
use crate::query::WorkflowQueryService;
use crate::validator::DecisionValidator;

/// State handed to every handler.
///
/// Everything here is built once from a single engine handle; handlers only
/// clone cheap `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: SignalDispatcher,
    pub queries: WorkflowQueryService,
    pub health: Arc<HealthMonitor>,
    pub counters: Arc<DispatchCounters>,
    /// Engine address reported by `/health`.
    pub engine_url: String,
    /// Engine namespace reported by `/health`.
    pub namespace: String,
}

impl AppState {
    /// Wire the components around one engine handle.
    pub fn new(engine: Arc<dyn EngineClient>, config: &Config) -> Self {
        let counters = Arc::new(DispatchCounters::new());
        let observer = FanoutObserver::new()
            .with(Arc::new(TracingObserver))
            .with(counters.clone());

        let validator = DecisionValidator::new(
            config.default_signal.clone(),
            &config.allowed_decisions,
        );

        Self {
            dispatcher: SignalDispatcher::new(engine.clone(), validator, Arc::new(observer)),
            queries: WorkflowQueryService::new(engine.clone(), config.pagination.clone()),
            health: Arc::new(HealthMonitor::new(engine, config.health.clone())),
            counters,
            engine_url: config.engine.base_url.clone(),
            namespace: config.engine.namespace.clone(),
        }
    }
}
