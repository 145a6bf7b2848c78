// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HITL Bridge server binary.

use std::sync::Arc;

use hitl_bridge::{Config, Server, wait_for_engine};
use hitl_engine_client::HttpEngineClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading HITL_LOG_FORMAT
    let dotenv = dotenvy::dotenv();

    init_tracing();

    if let Err(e) = dotenv {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        bind_addr = %config.bind_addr,
        engine = %config.engine.base_url,
        namespace = %config.engine.namespace,
        default_signal = %config.default_signal,
        strict_pagination = config.pagination.strict,
        "Starting HITL bridge"
    );

    let engine = Arc::new(HttpEngineClient::new(config.engine.clone())?);

    // No traffic is served until the engine has answered once.
    wait_for_engine(
        engine.as_ref(),
        config.startup_attempts,
        config.engine.retry_backoff,
    )
    .await?;

    Server::new(engine, config).run(shutdown_signal()).await?;

    info!("HITL bridge shut down");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hitl_bridge=info,hitl_engine_client=info,tower_http=info".into());

    let json = std::env::var("HITL_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
