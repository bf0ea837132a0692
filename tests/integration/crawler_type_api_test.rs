// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use serde_json::{json, Value};

use super::helpers::{create_test_app, data};

#[tokio::test]
async fn test_health_and_version_are_public() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");

    let response = app.server.get("/version").await;
    assert_eq!(response.text(), env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_builtin_types_are_listed() {
    let app = create_test_app().await;

    let response = app.server.get("/crawler-types").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let types = data(response.json::<Value>());
    let ids: Vec<&str> = types
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["cheerio", "playwright", "puppeteer", "jsdom", "http"]);
}

#[tokio::test]
async fn test_create_type_derives_slug_and_rejects_duplicates() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/crawler-types")
        .json(&json!({
            "name": "Custom HTTP",
            "default_config": { "maxConcurrency": 50 }
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created = data(response.json::<Value>());
    assert_eq!(created["id"], "custom-http");
    assert_eq!(created["default_config"]["maxConcurrency"], 50);

    let fetched = data(app.server.get("/crawler-types/custom-http").await.json::<Value>());
    assert_eq!(fetched["name"], "Custom HTTP");

    let response = app
        .server
        .post("/crawler-types")
        .json(&json!({ "id": "Custom HTTP" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn test_create_type_validation() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/crawler-types")
        .json(&json!({ "description": "nameless" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/crawler-types")
        .json(&json!({ "name": "broken", "default_selectors": "{not json" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Validation");

    let response = app.server.get("/crawler-types/broken").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_config_template() {
    let app = create_test_app().await;

    let template = data(
        app.server
            .get("/config-template")
            .add_query_param("type", "playwright")
            .await
            .json::<Value>(),
    );
    assert_eq!(template["type"], "playwright");
    assert_eq!(template["config"]["maxConcurrency"], 5);
    assert!(template["session_pool_config"].is_object());

    let fallback = data(app.server.get("/config-template").await.json::<Value>());
    assert_eq!(fallback["type"], "cheerio");

    let response = app
        .server
        .get("/config-template")
        .add_query_param("type", "nope")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
