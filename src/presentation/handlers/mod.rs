// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::Json;
use serde::Serialize;

/// HTTP请求处理器模块
///
/// 每个处理器负责解析请求、调用领域服务并返回统一格式的响应
pub mod crawler_handler;
pub mod crawler_type_handler;
pub mod service_handler;

/// 成功响应包装 `{success: true, data}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}
