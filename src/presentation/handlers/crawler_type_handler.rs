// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use validator::Validate;

use crate::{
    application::dto::{
        crawler_type_request::CreateCrawlerTypeRequestDto, query_request::ConfigTemplateQueryDto,
    },
    domain::services::{
        crawler_instance_manager::CrawlerInstanceManager,
        crawler_type_registry::CrawlerTypeRegistry,
    },
    presentation::{
        errors::AppError,
        extractors::request::{JsonBody, PathParam, QueryParams},
        handlers::ApiResponse,
    },
};

/// 列出所有爬虫类型
pub async fn list_crawler_types(
    Extension(registry): Extension<Arc<CrawlerTypeRegistry>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(registry.list().await?))
}

/// 获取单个爬虫类型
pub async fn get_crawler_type(
    Extension(registry): Extension<Arc<CrawlerTypeRegistry>>,
    PathParam(id): PathParam<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(registry.get(&id).await?))
}

/// 创建爬虫类型
pub async fn create_crawler_type(
    Extension(registry): Extension<Arc<CrawlerTypeRegistry>>,
    JsonBody(request): JsonBody<CreateCrawlerTypeRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let created = registry.create(request.into()).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

/// 按类型默认值生成实例配置模板
pub async fn config_template(
    Extension(manager): Extension<Arc<CrawlerInstanceManager>>,
    QueryParams(query): QueryParams<ConfigTemplateQueryDto>,
) -> Result<impl IntoResponse, AppError> {
    let template = manager
        .config_template(query.crawler_type.as_deref())
        .await?;
    Ok(ApiResponse::ok(template))
}
