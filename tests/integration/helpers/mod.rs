// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum_test::TestServer;
use crawlplane::config::settings::{ServiceDefinition, SupervisorSettings};
use crawlplane::domain::repositories::config_store::ConfigStore;
use crawlplane::domain::repositories::process_run_repository::ProcessRunRepository;
use crawlplane::domain::services::crawler_instance_manager::CrawlerInstanceManager;
use crawlplane::domain::services::crawler_type_registry::CrawlerTypeRegistry;
use crawlplane::infrastructure::process::probe::SystemProcessProbe;
use crawlplane::infrastructure::process::registry::ProcessRegistry;
use crawlplane::infrastructure::process::supervisor::ProcessSupervisor;
use crawlplane::infrastructure::repositories::file_store::FileStore;
use crawlplane::infrastructure::repositories::process_run_repo_impl::ProcessRunRepositoryImpl;
use crawlplane::presentation::middleware::auth_middleware::ServiceAuth;
use crawlplane::presentation::routes::{app_router, AppComponents};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub supervisor: Arc<ProcessSupervisor>,
    pub registry: Arc<ProcessRegistry>,
    // Keep the data directory alive
    pub data_dir: TempDir,
}

/// 测试应用选项
#[derive(Default)]
pub struct TestAppOptions {
    pub service_token: Option<String>,
    pub services: Vec<ServiceDefinition>,
    pub permissive_transitions: bool,
    /// 在内存 SQLite 中记录服务运行历史
    pub run_history: bool,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_options(TestAppOptions::default()).await
}

pub async fn create_test_app_with_options(options: TestAppOptions) -> TestApp {
    let data_dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ConfigStore> = Arc::new(FileStore::new(data_dir.path().join("data")));

    let crawler_types = Arc::new(CrawlerTypeRegistry::new(store.clone()));
    let crawlers = Arc::new(CrawlerInstanceManager::new(
        store,
        crawler_types.clone(),
        !options.permissive_transitions,
    ));

    let runs: Option<Arc<dyn ProcessRunRepository>> = if options.run_history {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Some(Arc::new(ProcessRunRepositoryImpl::new(Arc::new(db))))
    } else {
        None
    };

    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(ProcessSupervisor::new(
        options.services,
        registry.clone(),
        Arc::new(SystemProcessProbe),
        runs,
        SupervisorSettings {
            start_grace_ms: 300,
            stop_grace_ms: 500,
            kill_wait_ms: 1000,
        },
    ));

    let app = app_router(AppComponents {
        crawler_types,
        crawlers,
        supervisor: supervisor.clone(),
        service_auth: ServiceAuth::new(options.service_token.as_deref()),
    });

    let server = TestServer::new(app).unwrap();
    TestApp {
        server,
        supervisor,
        registry,
        data_dir,
    }
}

#[allow(dead_code)]
pub fn service(id: &str, command: &str, args: &[&str]) -> ServiceDefinition {
    ServiceDefinition {
        id: id.to_string(),
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        cwd: None,
        optional: false,
    }
}

/// 取出成功响应中的 `data`
pub fn data(body: Value) -> Value {
    assert_eq!(body["success"], true, "unexpected body: {}", body);
    body["data"].clone()
}
