// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use serde_json::{json, Value};

use super::helpers::{create_test_app, create_test_app_with_options, data, TestAppOptions};

async fn create_crawler(server: &axum_test::TestServer, body: Value) -> Value {
    let response = server.post("/crawlers").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    data(response.json::<Value>())
}

#[tokio::test]
async fn test_custom_type_scenario() {
    let app = create_test_app().await;

    app.server
        .post("/crawler-types")
        .json(&json!({ "name": "Custom HTTP", "default_config": { "maxConcurrency": 50 } }))
        .await;

    let crawler = create_crawler(&app.server, json!({ "name": "n", "type": "custom-http" })).await;
    assert_eq!(crawler["type"], "custom-http");
    assert_eq!(crawler["status"], "idle");
    assert_eq!(crawler["config"]["maxConcurrency"], 50);
    assert_eq!(crawler["created_at"], crawler["updated_at"]);
    assert_eq!(crawler["stats"]["requestsTotal"], 0);
}

#[tokio::test]
async fn test_crud_round_trip() {
    let app = create_test_app().await;
    let crawler = create_crawler(&app.server, json!({ "name": "news" })).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let listed = data(app.server.get("/crawlers").await.json::<Value>());
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let updated = data(
        app.server
            .put(&format!("/crawlers/{}", id))
            .json(&json!({ "description": "daily", "config": { "maxConcurrency": 3 } }))
            .await
            .json::<Value>(),
    );
    assert_eq!(updated["name"], "news");
    assert_eq!(updated["description"], "daily");
    assert_eq!(updated["config"]["maxConcurrency"], 3);

    let response = app.server.delete(&format!("/crawlers/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app.server.get(&format!("/crawlers/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "NotFound");
}

#[tokio::test]
async fn test_unknown_id_is_not_found_everywhere() {
    let app = create_test_app().await;

    for path in ["start", "pause", "resume", "stop"] {
        let response = app.server.post(&format!("/crawlers/missing/{}", path)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
    }
    for path in ["results", "logs", "stats"] {
        let response = app.server.get(&format!("/crawlers/missing/{}", path)).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{}", path);
    }
}

#[tokio::test]
async fn test_start_then_add_seeds_keeps_order() {
    let app = create_test_app().await;
    let crawler = create_crawler(&app.server, json!({ "name": "seeded" })).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let started = data(
        app.server
            .post(&format!("/crawlers/{}/start", id))
            .json(&json!({ "seeds": ["https://a.example"] }))
            .await
            .json::<Value>(),
    );
    assert_eq!(started["status"], "running");
    assert!(started["started_at"].is_string());

    let seeded = data(
        app.server
            .post(&format!("/crawlers/{}/seeds", id))
            .json(&json!({ "seeds": [{ "url": "https://b.example", "label": "b" }] }))
            .await
            .json::<Value>(),
    );
    let urls: Vec<&str> = seeded["seeds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    assert_eq!(seeded["seeds"][1]["status"], "pending");
    assert_eq!(seeded["seeds"][1]["priority"], 0);
}

#[tokio::test]
async fn test_start_accepts_an_empty_body() {
    let app = create_test_app().await;
    let crawler = create_crawler(&app.server, json!({})).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let response = app.server.post(&format!("/crawlers/{}/start", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(data(response.json::<Value>())["status"], "running");
}

#[tokio::test]
async fn test_seed_without_url_is_rejected() {
    let app = create_test_app().await;
    let crawler = create_crawler(&app.server, json!({})).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/crawlers/{}/seeds", id))
        .json(&json!({ "seeds": [{ "label": "no url" }] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let stored = data(app.server.get(&format!("/crawlers/{}", id)).await.json::<Value>());
    assert!(stored["seeds"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_lifecycle_is_strict_by_default() {
    let app = create_test_app().await;
    let crawler = create_crawler(&app.server, json!({})).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let response = app.server.post(&format!("/crawlers/{}/pause", id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "InvalidTransition");
    assert_eq!(body["details"]["status"], "idle");

    app.server.post(&format!("/crawlers/{}/start", id)).await;
    let paused = data(
        app.server
            .post(&format!("/crawlers/{}/pause", id))
            .await
            .json::<Value>(),
    );
    assert_eq!(paused["status"], "paused");

    let resumed = data(
        app.server
            .post(&format!("/crawlers/{}/resume", id))
            .await
            .json::<Value>(),
    );
    assert_eq!(resumed["status"], "running");

    let stopped = data(
        app.server
            .post(&format!("/crawlers/{}/stop", id))
            .await
            .json::<Value>(),
    );
    assert_eq!(stopped["status"], "idle");
    assert_eq!(stopped["finished_at"], stopped["updated_at"]);
}

#[tokio::test]
async fn test_permissive_lifecycle() {
    let app = create_test_app_with_options(TestAppOptions {
        permissive_transitions: true,
        ..Default::default()
    })
    .await;
    let crawler = create_crawler(&app.server, json!({})).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let paused = data(
        app.server
            .post(&format!("/crawlers/{}/pause", id))
            .await
            .json::<Value>(),
    );
    assert_eq!(paused["status"], "paused");
}

#[tokio::test]
async fn test_results_logs_and_stats_reads() {
    let app = create_test_app().await;
    let crawler = create_crawler(&app.server, json!({})).await;
    let id = crawler["id"].as_str().unwrap().to_string();

    let results = data(
        app.server
            .get(&format!("/crawlers/{}/results", id))
            .add_query_param("limit", 5000)
            .await
            .json::<Value>(),
    );
    assert_eq!(results["total"], 0);
    assert_eq!(results["limit"], 1000);

    let logs = data(app.server.get(&format!("/crawlers/{}/logs", id)).await.json::<Value>());
    assert_eq!(logs["limit"], 100);
    assert!(logs["items"].as_array().unwrap().is_empty());

    let stats = data(app.server.get(&format!("/crawlers/{}/stats", id)).await.json::<Value>());
    assert_eq!(stats["requestsFailed"], 0);
}

#[tokio::test]
async fn test_malformed_bodies_get_structured_errors() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/crawlers")
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation");

    let response = app
        .server
        .post("/crawler-types")
        .text("[1, 2")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Validation");

    let response = app
        .server
        .get("/crawlers/missing/results")
        .add_query_param("limit", "lots")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["success"], false);
}
