// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::presentation::errors::AppError;
use crate::utils::errors::ControlError;

/// 服务令牌请求头
pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// 进程控制接口认证状态
///
/// 只保存共享密钥的摘要；未配置密钥时所有请求放行
#[derive(Clone, Default)]
pub struct ServiceAuth {
    token_digest: Option<[u8; 32]>,
}

impl ServiceAuth {
    pub fn new(service_token: Option<&str>) -> Self {
        let token_digest = service_token
            .filter(|token| !token.is_empty())
            .map(digest);
        Self { token_digest }
    }

    pub fn is_enabled(&self) -> bool {
        self.token_digest.is_some()
    }

    /// 检查请求头中的令牌
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.token_digest else {
            return true;
        };
        presented_token(headers).is_some_and(|token| digest(token) == expected)
    }
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// 依次读取 `X-Service-Token` 与 `Authorization: Bearer`
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get(SERVICE_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return Some(token.trim());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// 认证中间件
///
/// 仅挂载在 `/services` 路由上
///
/// # 参数
///
/// * `state` - 认证状态
/// * `req` - HTTP请求
/// * `next` - 下一个中间件
pub async fn service_auth_middleware(
    State(auth): State<ServiceAuth>,
    req: Request,
    next: Next,
) -> Response {
    if auth.authorize(req.headers()) {
        return next.run(req).await;
    }

    warn!(path = %req.uri().path(), "rejected service request without a valid token");
    metrics::counter!("auth_rejections_total").increment(1);
    AppError::from(ControlError::Unauthorized).into_response()
}
