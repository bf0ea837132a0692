// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, response::IntoResponse};
use std::sync::Arc;

use crate::{
    application::dto::query_request::RunsQueryDto,
    infrastructure::process::supervisor::ProcessSupervisor,
    presentation::{
        errors::AppError,
        extractors::request::{PathParam, QueryParams},
        handlers::ApiResponse,
    },
};

/// 列出目录中所有服务的状态
pub async fn list_services(
    Extension(supervisor): Extension<Arc<ProcessSupervisor>>,
) -> impl IntoResponse {
    ApiResponse::ok(supervisor.status_all().await)
}

/// 启动服务（幂等）
pub async fn start_service(
    Extension(supervisor): Extension<Arc<ProcessSupervisor>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(supervisor.start(&id).await?))
}

/// 停止服务，必要时升级为强制终止
pub async fn stop_service(
    Extension(supervisor): Extension<Arc<ProcessSupervisor>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(supervisor.stop(&id).await?))
}

pub async fn service_status(
    Extension(supervisor): Extension<Arc<ProcessSupervisor>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(supervisor.status(&id).await?))
}

/// 服务运行审计记录，最新的在前；文件存储后端下为空列表
pub async fn service_runs(
    Extension(supervisor): Extension<Arc<ProcessSupervisor>>,
    PathParam(id): PathParam<String>,
    QueryParams(query): QueryParams<RunsQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(
        supervisor.recent_runs(&id, query.effective_limit()).await?,
    ))
}
