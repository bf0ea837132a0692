// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{body::Bytes, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    application::dto::{
        crawler_instance_request::CrawlerInstanceRequestDto,
        query_request::PageQueryDto,
        seed_request::{AddSeedsRequestDto, StartCrawlerRequestDto},
    },
    domain::services::crawler_instance_manager::CrawlerInstanceManager,
    presentation::{
        errors::AppError,
        extractors::request::{JsonBody, PathParam, QueryParams},
        handlers::ApiResponse,
    },
    utils::errors::ControlError,
};

/// 列出所有爬虫实例
pub async fn list_crawlers(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.list().await?))
}

/// 创建爬虫实例
pub async fn create_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    JsonBody(request): JsonBody<CrawlerInstanceRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let instance = manager.create(request.into()).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(instance)))
}

pub async fn get_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.get(&id).await?))
}

/// 更新爬虫实例，只有请求中出现的字段生效
pub async fn update_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
    JsonBody(request): JsonBody<CrawlerInstanceRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    Ok(ApiResponse::ok(manager.update(&id, request.into()).await?))
}

pub async fn delete_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    manager.delete(&id).await?;
    Ok(ApiResponse::ok(json!({ "id": id, "deleted": true })))
}

/// 启动爬虫
///
/// 请求体可以为空；存在时携带要追加的种子
pub async fn start_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: StartCrawlerRequestDto = if body.iter().all(u8::is_ascii_whitespace) {
        StartCrawlerRequestDto::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ControlError::Validation(format!("invalid start payload: {}", e)))?
    };
    request.validate()?;

    Ok(ApiResponse::ok(manager.start(&id, request.into_seeds()).await?))
}

pub async fn pause_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.pause(&id).await?))
}

pub async fn resume_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.resume(&id).await?))
}

pub async fn stop_crawler(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.stop(&id).await?))
}

/// 追加种子
pub async fn add_seeds(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
    JsonBody(request): JsonBody<AddSeedsRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    Ok(ApiResponse::ok(
        manager.add_seeds(&id, request.into_seeds()).await?,
    ))
}

/// 分页读取结果
pub async fn get_results(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
    QueryParams(query): QueryParams<PageQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.results(&id, query.into()).await?))
}

/// 分页读取日志
pub async fn get_logs(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
    QueryParams(query): QueryParams<PageQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.logs(&id, query.into()).await?))
}

pub async fn get_stats(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(manager.stats(&id).await?))
}
