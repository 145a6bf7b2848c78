// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP server assembly and lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use hitl_engine_client::{EngineClient, EngineError};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::routes;
use crate::state::AppState;

/// The bridge HTTP server.
pub struct Server {
    state: AppState,
    config: Config,
}

impl Server {
    /// Create a server around an engine handle.
    pub fn new(engine: Arc<dyn EngineClient>, config: Config) -> Self {
        Self {
            state: AppState::new(engine, &config),
            config,
        }
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::landing_routes())
            .merge(routes::health_routes())
            .merge(routes::decision_routes())
            .merge(routes::workflow_routes())
            .layer(cors_layer(&self.config.allowed_origins))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
            .merge(routes::swagger_ui())
    }

    /// Serve until `shutdown` completes.
    ///
    /// The health monitor loop runs alongside the listener and is stopped
    /// once the server has drained.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_addr;
        let router = self.router();

        let monitor = self.state.health.clone();
        let monitor_shutdown = monitor.shutdown_handle();
        let monitor_task = tokio::spawn(async move { monitor.run().await });

        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, "HITL bridge listening");

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        monitor_shutdown.notify_one();
        if let Err(e) = monitor_task.await {
            warn!(error = %e, "Health monitor task ended abnormally");
        }

        let totals = self.state.counters.snapshot();
        info!(
            delivered = totals.delivered,
            not_found = totals.not_found,
            already_completed = totals.already_completed,
            invalid_signal = totals.invalid_signal,
            engine_unavailable = totals.engine_unavailable,
            "HITL bridge stopped"
        );

        served?;
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
}

/// Block until the engine answers a connectivity check.
///
/// Makes up to `attempts` checks, doubling `backoff` between them. Returns
/// the last error if the engine never answered.
pub async fn wait_for_engine(
    engine: &dyn EngineClient,
    attempts: u32,
    backoff: Duration,
) -> std::result::Result<Duration, EngineError> {
    let mut delay = backoff;
    let mut attempt = 1;
    loop {
        match engine.check_connectivity().await {
            Ok(latency) => {
                info!(
                    attempt,
                    latency_ms = latency.as_millis() as u64,
                    "Engine reachable"
                );
                return Ok(latency);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Engine not reachable yet"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
