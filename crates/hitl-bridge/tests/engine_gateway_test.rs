// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Router backed by the real HTTP engine client against a wiremock engine.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use hitl_bridge::{Config, Server, wait_for_engine};
use hitl_engine_client::{EngineConfig, HttpEngineClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_for(engine: &MockServer) -> (Server, Arc<HttpEngineClient>) {
    let engine_config = EngineConfig::new()
        .with_base_url(engine.uri())
        .with_namespace("approvals")
        .with_request_timeout(Duration::from_millis(500))
        .with_health_timeout(Duration::from_millis(300))
        .with_retries(2, Duration::from_millis(5));
    let client = Arc::new(HttpEngineClient::new(engine_config.clone()).unwrap());
    let config = Config::default().with_engine(engine_config);
    (Server::new(client.clone(), config), client)
}

async fn post_decision(server: &Server, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    common::send(
        server.router(),
        Method::POST,
        "/decision",
        Body::from(serde_json::to_vec(&body).unwrap()),
    )
    .await
}

#[tokio::test]
async fn test_decision_reaches_engine() {
    let engine = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/api/v1/namespaces/approvals/workflows/wf-123/signal/decision",
        ))
        .and(body_partial_json(json!({
            "signalName": "decision",
            "input": {"decision": "approved", "comment": "fine"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&engine)
        .await;

    let (server, _) = server_for(&engine);
    let (status, body) = post_decision(
        &server,
        json!({"workflowId": "wf-123", "payload": {"decision": "approved", "comment": "fine"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Delivered");
}

#[tokio::test]
async fn test_engine_outage_is_503_after_bounded_retries() {
    let engine = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&engine)
        .await;

    let (server, _) = server_for(&engine);
    let (status, body) = post_decision(
        &server,
        json!({"workflowId": "wf-1", "payload": {"decision": "rejected"}}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "EngineUnavailable");
}

#[tokio::test]
async fn test_engine_not_found_is_404() {
    let engine = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 5,
            "message": "workflow not found for ID: wf-404",
        })))
        .expect(1)
        .mount(&engine)
        .await;

    let (server, _) = server_for(&engine);
    let (status, body) = post_decision(
        &server,
        json!({"workflowId": "wf-404", "payload": {"decision": "approved"}}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "NotFound");
    assert_eq!(body["workflowId"], "wf-404");
}

#[tokio::test]
async fn test_listing_through_engine() {
    let engine = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/approvals/workflows"))
        .and(query_param("pageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executions": [
                {
                    "execution": {"workflowId": "wf-1", "runId": "r-1"},
                    "type": {"name": "Approval"},
                    "status": "WORKFLOW_EXECUTION_STATUS_RUNNING",
                    "startTime": "2025-03-01T09:00:00Z"
                },
                {"execution": {"workflowId": "wf-broken"}}
            ],
            "nextPageToken": ""
        })))
        .expect(1)
        .mount(&engine)
        .await;

    let (server, _) = server_for(&engine);
    let (status, body) = common::send(
        server.router(),
        Method::GET,
        "/workflows?pageSize=500",
        Body::empty(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let executions = body["executions"].as_array().unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0]["workflowId"], "wf-1");
    assert!(body.get("nextPageToken").is_none());
}

#[tokio::test]
async fn test_startup_waits_for_engine() {
    let engine = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/system-info"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&engine)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/system-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&engine)
        .await;

    let (_, client) = server_for(&engine);
    let latency = wait_for_engine(client.as_ref(), 5, Duration::from_millis(5)).await;
    assert!(latency.is_ok());
}
