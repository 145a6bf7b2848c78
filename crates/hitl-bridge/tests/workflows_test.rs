// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! `GET /workflows` and `GET /workflows/{workflowId}` through the full router.

mod common;

use std::collections::HashSet;

use axum::http::StatusCode;
use common::TestApp;
use hitl_bridge::Config;
use hitl_engine_client::{ExecutionStatus, MockEngine};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_page_size_above_max_is_clamped() {
    let app = TestApp::new();
    app.engine.add_running("wf", 120).await;

    let (status, body) = app.get("/workflows?pageSize=150").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executions"].as_array().unwrap().len(), 100);
    assert!(body["nextPageToken"].is_string());
    assert_eq!(app.engine.last_list_options().await.unwrap().page_size, 100);
}

#[tokio::test]
async fn test_page_size_above_max_is_rejected_in_strict_mode() {
    let app = TestApp::with_config(Config::default().with_strict_pagination(true));

    let (status, body) = app.get("/workflows?pageSize=150").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert_eq!(app.engine.list_calls(), 0);
}

#[tokio::test]
async fn test_default_page_size() {
    let app = TestApp::new();
    app.engine.add_running("wf", 25).await;

    let (status, body) = app.get("/workflows").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executions"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_chained_pages_cover_every_execution() {
    let app = TestApp::new();
    app.engine.add_running("wf", 23).await;

    let mut seen = HashSet::new();
    let mut uri = "/workflows?pageSize=5".to_string();
    loop {
        let (status, body) = app.get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        for execution in body["executions"].as_array().unwrap() {
            let id = execution["workflowId"].as_str().unwrap().to_string();
            assert!(seen.insert(id), "duplicate execution");
        }
        match body["nextPageToken"].as_str() {
            Some(token) => {
                uri = format!(
                    "/workflows?pageSize=5&pageToken={}",
                    token.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D")
                );
            }
            None => break,
        }
    }

    assert_eq!(seen.len(), 23);
}

#[tokio::test]
async fn test_summary_shape() {
    let app = TestApp::new();
    app.engine.add_execution("wf-open", ExecutionStatus::Running).await;
    app.engine.add_execution("wf-done", ExecutionStatus::TimedOut).await;

    let (_, body) = app.get("/workflows").await;
    let executions = body["executions"].as_array().unwrap();

    assert_eq!(executions[0]["workflowId"], "wf-open");
    assert_eq!(executions[0]["runId"], "run-0");
    assert_eq!(executions[0]["workflowType"], "ApprovalWorkflow");
    assert_eq!(executions[0]["status"], "Running");
    assert_eq!(executions[0]["startTime"], "2025-01-01T00:00:00Z");
    assert!(executions[0].get("closeTime").is_none());

    assert_eq!(executions[1]["status"], "TimedOut");
    assert_eq!(executions[1]["closeTime"], "2025-01-01T01:00:00Z");
    assert!(body.get("nextPageToken").is_none());
}

#[tokio::test]
async fn test_malformed_record_does_not_fail_the_page() {
    let app = TestApp::new();
    app.engine.add_running("wf", 3).await;
    app.engine
        .add_raw_record(json!({"execution": {"workflowId": "half"}, "status": 12}))
        .await;

    let (status, body) = app.get("/workflows").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["executions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_filter_is_passed_through() {
    let app = TestApp::new();

    let (status, _) = app
        .get("/workflows?filter=WorkflowType%20%3D%20%27Approval%27")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.engine.last_list_options().await.unwrap().query.as_deref(),
        Some("WorkflowType = 'Approval'")
    );
}

#[tokio::test]
async fn test_bad_parameters_are_rejected() {
    let app = TestApp::new();
    let oversized = "a".repeat(3000);

    for uri in [
        format!("/workflows?filter={}", oversized),
        "/workflows?pageToken=not-base64!".to_string(),
        "/workflows?pageSize=many".to_string(),
    ] {
        let (status, body) = app.get(&uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["code"], "bad_request");
    }
    assert_eq!(app.engine.list_calls(), 0);
}

#[tokio::test]
async fn test_listing_with_engine_down() {
    let app = TestApp::with_engine(Arc::new(MockEngine::unreachable()), Config::default());

    let (status, body) = app.get("/workflows").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "service_unavailable");
}

#[tokio::test]
async fn test_describe_workflow() {
    let app = TestApp::new();
    app.engine.add_execution("wf-42", ExecutionStatus::Completed).await;

    let (status, body) = app.get("/workflows/wf-42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflowId"], "wf-42");
    assert_eq!(body["status"], "Completed");

    let (status, body) = app.get("/workflows/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = app.get("/workflows/-dash").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_describe_workflow_id_with_slash() {
    let app = TestApp::new();
    app.engine
        .add_execution("orders/42", ExecutionStatus::Running)
        .await;

    let (status, body) = app.get("/workflows/orders%2F42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflowId"], "orders/42");
}
