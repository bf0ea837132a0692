// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::models::crawler_instance::CrawlerStatus;
use crate::domain::repositories::config_store::StoreError;

/// 控制平面错误类型
///
/// 校验与冲突错误在写入存储之前同步返回，不产生部分写入
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("cannot {action} crawler {id} while it is {from}")]
    InvalidTransition {
        id: String,
        action: &'static str,
        from: CrawlerStatus,
    },

    #[error("service {service} exited immediately with {}", describe_exit(.code, .signal))]
    ImmediateExit {
        service: String,
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("failed to spawn service {service}: {reason}")]
    SpawnFailed { service: String, reason: String },

    #[error("service not running: {0}")]
    NotRunning(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("unauthorized")]
    Unauthorized,
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("exit code {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => "unknown status".to_string(),
    }
}

impl ControlError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ControlError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// 错误类别名称，作为响应中的 `error` 字段
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::NotFound { .. } => "NotFound",
            ControlError::Validation(_) => "Validation",
            ControlError::Conflict(_) => "Conflict",
            ControlError::InvalidTransition { .. } => "InvalidTransition",
            ControlError::ImmediateExit { .. } => "ProcessImmediateExit",
            ControlError::SpawnFailed { .. } => "SpawnFailed",
            ControlError::NotRunning(_) => "NotRunning",
            ControlError::Persistence(_) => "PersistenceFailure",
            ControlError::Unauthorized => "Unauthorized",
        }
    }

    /// 附加的结构化信息
    pub fn details(&self) -> Value {
        match self {
            ControlError::ImmediateExit {
                service,
                code,
                signal,
            } => json!({
                "message": self.to_string(),
                "service": service,
                "exitCode": code,
                "signal": signal,
            }),
            ControlError::InvalidTransition { id, action, from } => json!({
                "message": self.to_string(),
                "id": id,
                "action": action,
                "status": from,
            }),
            ControlError::NotFound { entity, id } => json!({
                "message": self.to_string(),
                "entity": entity,
                "id": id,
            }),
            _ => json!({ "message": self.to_string() }),
        }
    }
}
