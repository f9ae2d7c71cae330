// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API tests driving the router in-process.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::TestContext;
use sitekeeper::server;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": name, "description": "test site" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["site"].clone()
}

#[tokio::test]
async fn test_health_and_version() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_list_empty() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());

    let (status, body) = send(&app, Method::GET, "/api/sites", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sites": [] }));
}

#[tokio::test]
async fn test_create_and_list() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": "Test", "description": "d" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Site created successfully");
    let site = &body["site"];
    assert_eq!(site["name"], "Test");
    assert_eq!(site["port"], 8000);
    assert_eq!(site["url"], "http://localhost:8000");
    assert_eq!(site["status"], "running");
    assert!(site["createdAt"].is_string());

    let (status, body) = send(&app, Method::GET, "/api/sites", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sites"].as_array().unwrap().len(), 1);
    assert_eq!(body["sites"][0]["id"], site["id"]);
}

#[tokio::test]
async fn test_create_validation() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": "", "description": "d" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Site name and description are required");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": "Test" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(ctx.driver.calls().await.is_empty());
}

#[tokio::test]
async fn test_create_invalid_json() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/sites")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_site() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());

    for (method, uri) in [
        (Method::GET, "/api/sites/unknown"),
        (Method::DELETE, "/api/sites/unknown"),
        (Method::POST, "/api/sites/unknown/stop"),
        (Method::POST, "/api/sites/unknown/start"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"], "Site unknown not found");
    }
}

#[tokio::test]
async fn test_delete_running_site_refused() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());
    let site = create(&app, "Blog").await;
    let id = site["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::DELETE, &format!("/api/sites/{id}"), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Cannot delete a running site. Please stop it first."
    );
    let (status, _) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stop_start_delete() {
    let ctx = TestContext::new();
    let app = server::router(ctx.manager.clone());
    let site = create(&app, "Blog").await;
    let id = site["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::POST, &format!("/api/sites/{id}/stop"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Site {id} stopped successfully"));
    let (_, body) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(body["status"], "stopped");

    let (status, body) = send(&app, Method::POST, &format!("/api/sites/{id}/start"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Site {id} started successfully"));
    let (_, body) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(body["status"], "running");

    send(&app, Method::POST, &format!("/api/sites/{id}/stop"), None).await;
    let (status, body) = send(&app, Method::DELETE, &format!("/api/sites/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Site {id} deleted successfully"));

    let (_, body) = send(&app, Method::GET, "/api/sites", None).await;
    assert_eq!(body, json!({ "sites": [] }));
}

#[tokio::test]
async fn test_provision_failure_is_500() {
    let ctx = TestContext::with_driver(sitekeeper::driver::MockDriver::failing_apply());
    let app = server::router(ctx.manager.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": "Test", "description": "d" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}
