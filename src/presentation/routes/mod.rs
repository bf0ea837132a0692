// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::services::{
    crawler_instance_manager::CrawlerInstanceManager, crawler_type_registry::CrawlerTypeRegistry,
};
use crate::infrastructure::process::supervisor::ProcessSupervisor;
use crate::presentation::handlers::{crawler_handler, crawler_type_handler, service_handler};
use crate::presentation::middleware::auth_middleware::{service_auth_middleware, ServiceAuth};

/// 路由依赖的组件
#[derive(Clone)]
pub struct AppComponents {
    pub crawler_types: Arc<CrawlerTypeRegistry>,
    pub crawlers: Arc<CrawlerInstanceManager>,
    pub supervisor: Arc<ProcessSupervisor>,
    pub service_auth: ServiceAuth,
}

/// 创建应用路由
///
/// 爬虫类型与实例接口开放；`/services` 下的进程控制接口经过共享密钥认证
pub fn app_router(components: AppComponents) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let crawler_routes = Router::new()
        .route(
            "/crawler-types",
            get(crawler_type_handler::list_crawler_types)
                .post(crawler_type_handler::create_crawler_type),
        )
        .route(
            "/crawler-types/{id}",
            get(crawler_type_handler::get_crawler_type),
        )
        .route("/config-template", get(crawler_type_handler::config_template))
        .route(
            "/crawlers",
            get(crawler_handler::list_crawlers).post(crawler_handler::create_crawler),
        )
        .route(
            "/crawlers/{id}",
            get(crawler_handler::get_crawler)
                .put(crawler_handler::update_crawler)
                .delete(crawler_handler::delete_crawler),
        )
        .route("/crawlers/{id}/start", post(crawler_handler::start_crawler))
        .route("/crawlers/{id}/pause", post(crawler_handler::pause_crawler))
        .route("/crawlers/{id}/resume", post(crawler_handler::resume_crawler))
        .route("/crawlers/{id}/stop", post(crawler_handler::stop_crawler))
        .route("/crawlers/{id}/seeds", post(crawler_handler::add_seeds))
        .route("/crawlers/{id}/results", get(crawler_handler::get_results))
        .route("/crawlers/{id}/logs", get(crawler_handler::get_logs))
        .route("/crawlers/{id}/stats", get(crawler_handler::get_stats))
        .layer(Extension(components.crawler_types))
        .layer(Extension(components.crawlers));

    let service_routes = Router::new()
        .route("/services", get(service_handler::list_services))
        .route("/services/{id}/start", post(service_handler::start_service))
        .route("/services/{id}/stop", post(service_handler::stop_service))
        .route("/services/{id}/status", get(service_handler::service_status))
        .route("/services/{id}/runs", get(service_handler::service_runs))
        .layer(middleware::from_fn_with_state(
            components.service_auth,
            service_auth_middleware,
        ))
        .layer(Extension(components.supervisor));

    Router::new()
        .merge(public_routes)
        .merge(crawler_routes)
        .merge(service_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
