// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::StatusCode;
use serde_json::Value;

use super::helpers::{create_test_app_with_options, data, service, TestAppOptions};

fn options(token: Option<&str>) -> TestAppOptions {
    TestAppOptions {
        service_token: token.map(str::to_string),
        services: vec![
            service("sleeper", "sleep", &["31.5"]),
            service("failing", "sh", &["-c", "exit 1"]),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_services_require_token_when_configured() {
    let app = create_test_app_with_options(options(Some("s3cret"))).await;

    let response = app.server.get("/services").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Unauthorized");

    let response = app
        .server
        .get("/services")
        .add_header("X-Service-Token", "s3cret")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .server
        .get("/services")
        .add_header("Authorization", "Bearer s3cret")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Crawler routes are not gated.
    let response = app.server.get("/crawlers").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_start_status_stop_cycle() {
    let app = create_test_app_with_options(options(None)).await;

    let first = data(app.server.post("/services/sleeper/start").await.json::<Value>());
    let second = data(app.server.post("/services/sleeper/start").await.json::<Value>());
    assert_eq!(first["pid"], second["pid"]);
    assert_eq!(first["status"], "running");

    let status = data(app.server.get("/services/sleeper/status").await.json::<Value>());
    assert_eq!(status["running"], true);
    assert_eq!(status["source"], "tracked");
    assert_eq!(status["pid"], first["pid"]);

    let stopped = data(app.server.post("/services/sleeper/stop").await.json::<Value>());
    assert_eq!(stopped["status"], "stopped");
    assert!(app.registry.is_empty());

    let response = app.server.post("/services/sleeper/stop").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"], "NotRunning");
}

#[tokio::test]
async fn test_immediate_exit_is_reported() {
    let app = create_test_app_with_options(options(None)).await;

    let response = app.server.post("/services/failing/start").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.json::<Value>();
    assert_eq!(body["error"], "ProcessImmediateExit");
    assert_eq!(body["details"]["exitCode"], 1);
    assert!(body["details"]["message"]
        .as_str()
        .unwrap()
        .contains("exit code 1"));
}

#[tokio::test]
async fn test_unknown_service() {
    let app = create_test_app_with_options(options(None)).await;

    let response = app.server.post("/services/nope/start").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let list = data(app.server.get("/services").await.json::<Value>());
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["sleeper", "failing"]);
}

#[tokio::test]
async fn test_run_history_is_listed_behind_auth() {
    let app = create_test_app_with_options(TestAppOptions {
        run_history: true,
        ..options(Some("s3cret"))
    })
    .await;

    let response = app.server.get("/services/sleeper/runs").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let started = data(
        app.server
            .post("/services/sleeper/start")
            .add_header("X-Service-Token", "s3cret")
            .await
            .json::<Value>(),
    );
    app.server
        .post("/services/sleeper/stop")
        .add_header("X-Service-Token", "s3cret")
        .await;

    let runs = data(
        app.server
            .get("/services/sleeper/runs")
            .add_query_param("limit", 5)
            .add_header("X-Service-Token", "s3cret")
            .await
            .json::<Value>(),
    );
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["pid"], started["pid"]);
    assert_eq!(runs[0]["status"], "stopped");

    let response = app
        .server
        .get("/services/nope/runs")
        .add_header("X-Service-Token", "s3cret")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_run_history_is_empty_without_relational_store() {
    let app = create_test_app_with_options(options(None)).await;

    let runs = data(app.server.get("/services/failing/runs").await.json::<Value>());
    assert_eq!(runs, serde_json::json!([]));
}
