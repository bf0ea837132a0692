// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::ValidationErrors;

use crate::utils::errors::ControlError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，统一输出 `{success:false, error, details}`
#[derive(Debug)]
pub struct AppError(anyhow::Error);

/// 错误类别对应的 HTTP 状态码
pub fn status_for(err: &ControlError) -> StatusCode {
    match err {
        ControlError::NotFound { .. } => StatusCode::NOT_FOUND,
        ControlError::Validation(_) => StatusCode::BAD_REQUEST,
        ControlError::Conflict(_)
        | ControlError::InvalidTransition { .. }
        | ControlError::NotRunning(_) => StatusCode::CONFLICT,
        ControlError::Unauthorized => StatusCode::UNAUTHORIZED,
        ControlError::ImmediateExit { .. }
        | ControlError::SpawnFailed { .. }
        | ControlError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<ControlError>() {
            if status_for(err).is_server_error() {
                tracing::error!(error = %err, "request failed");
            }
            let body = Json(json!({
                "success": false,
                "error": err.kind(),
                "details": err.details(),
            }));
            return (status_for(err), body).into_response();
        }

        if let Some(errors) = self.0.downcast_ref::<ValidationErrors>() {
            let body = Json(json!({
                "success": false,
                "error": "Validation",
                "details": { "message": errors.to_string(), "fields": errors },
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        tracing::error!(error = %self.0, "unhandled error");
        let body = Json(json!({
            "success": false,
            "error": "Internal",
            "details": { "message": self.0.to_string() },
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::crawler_instance::CrawlerStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ControlError::not_found("crawler", "x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ControlError::InvalidTransition {
                id: "x".to_string(),
                action: "pause",
                from: CrawlerStatus::Idle,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ControlError::ImmediateExit {
                service: "svc".to_string(),
                code: Some(1),
                signal: None,
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&ControlError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_control_errors_keep_their_status() {
        let response = AppError::from(ControlError::Validation("bad".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
