// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common utilities for router integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use hitl_bridge::{Config, Server};
use hitl_engine_client::{EngineClient, MockEngine};
use serde_json::Value;
use tower::ServiceExt;

/// A router wired to an in-memory engine.
pub struct TestApp {
    pub engine: Arc<MockEngine>,
    pub server: Server,
}

impl TestApp {
    /// App with default configuration and an empty engine.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_engine(Arc::new(MockEngine::new()), config)
    }

    pub fn with_engine(engine: Arc<MockEngine>, config: Config) -> Self {
        let handle: Arc<dyn EngineClient> = engine.clone();
        Self {
            engine,
            server: Server::new(handle, config),
        }
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(self.router(), Method::GET, uri, Body::empty()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, serde_json::to_vec(&body).unwrap()).await
    }

    pub async fn post_raw(&self, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
        send(self.router(), Method::POST, uri, Body::from(body)).await
    }
}

/// Send one request through `router` and decode the JSON response.
///
/// Non-JSON bodies come back as a JSON string.
pub async fn send(router: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}
