// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crawlplane::config::settings::Settings;
use crawlplane::domain::services::crawler_instance_manager::CrawlerInstanceManager;
use crawlplane::domain::services::crawler_type_registry::CrawlerTypeRegistry;
use crawlplane::infrastructure::process::probe::SystemProcessProbe;
use crawlplane::infrastructure::process::registry::ProcessRegistry;
use crawlplane::infrastructure::process::supervisor::ProcessSupervisor;
use crawlplane::infrastructure::repositories::store_factory::create_config_store;
use crawlplane::presentation::middleware::auth_middleware::ServiceAuth;
use crawlplane::presentation::routes::{app_router, AppComponents};
use crawlplane::utils::telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting crawlplane...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!(
        services = settings.services.len(),
        backend = ?settings.storage.backend,
        "Configuration loaded"
    );

    crawlplane::infrastructure::metrics::init_metrics(&settings.metrics);

    // 3. Persistence
    let persistence = create_config_store(&settings).await?;
    info!(
        backend = persistence.config_store.backend_name(),
        "Config store ready"
    );

    // 4. Domain services
    let crawler_types = Arc::new(CrawlerTypeRegistry::new(persistence.config_store.clone()));
    let crawlers = Arc::new(CrawlerInstanceManager::new(
        persistence.config_store.clone(),
        crawler_types.clone(),
        settings.lifecycle.strict_transitions,
    ));

    // 5. Process supervisor
    let supervisor = Arc::new(ProcessSupervisor::new(
        settings.services.clone(),
        Arc::new(ProcessRegistry::new()),
        Arc::new(SystemProcessProbe),
        persistence.process_runs.clone(),
        settings.supervisor.clone(),
    ));

    let service_auth = ServiceAuth::new(settings.auth.service_token.as_deref());
    if !service_auth.is_enabled() {
        warn!("auth.service_token is not set; /services routes are open");
    }

    // 6. Start HTTP server
    let app = app_router(AppComponents {
        crawler_types,
        crawlers,
        supervisor: supervisor.clone(),
        service_auth,
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Do not leave orphaned children behind
    supervisor.shutdown_all().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
