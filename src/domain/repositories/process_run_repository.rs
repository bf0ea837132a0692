// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::managed_process::ManagedProcess;
use crate::domain::repositories::config_store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 服务运行审计记录仓库
///
/// 仅在配置了关系型存储时存在；审计记录在内存句柄移除后继续保留
#[async_trait]
pub trait ProcessRunRepository: Send + Sync {
    /// 写入一条 `running` 记录，返回记录ID
    async fn record_start(&self, process: &ManagedProcess) -> Result<Uuid, StoreError>;

    /// 将记录标记为 `stopped`
    async fn mark_stopped(
        &self,
        run_id: Uuid,
        stop_time: DateTime<Utc>,
        exit_code: Option<i32>,
    ) -> Result<(), StoreError>;

    /// 查询某服务最近的运行记录
    async fn recent_runs(
        &self,
        service_id: &str,
        limit: u64,
    ) -> Result<Vec<ManagedProcess>, StoreError>;
}
