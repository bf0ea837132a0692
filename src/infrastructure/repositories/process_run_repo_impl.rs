// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::managed_process::{ManagedProcess, ProcessStatus};
use crate::domain::repositories::config_store::StoreError;
use crate::domain::repositories::process_run_repository::ProcessRunRepository;
use crate::infrastructure::database::entities::service_run;

/// 服务运行审计记录仓库实现
pub struct ProcessRunRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ProcessRunRepositoryImpl {
    /// 创建新的运行记录仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProcessRunRepository for ProcessRunRepositoryImpl {
    async fn record_start(&self, process: &ManagedProcess) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let model = service_run::ActiveModel {
            id: Set(id),
            service_id: Set(process.service_id.clone()),
            pid: Set(i64::from(process.pid)),
            command: Set(process.command.clone()),
            args: Set(serde_json::to_value(&process.args)?),
            status: Set(ProcessStatus::Running.to_string()),
            start_time: Set(process.start_time.into()),
            stop_time: Set(None),
            exit_code: Set(None),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(id)
    }

    async fn mark_stopped(
        &self,
        run_id: Uuid,
        stop_time: DateTime<Utc>,
        exit_code: Option<i32>,
    ) -> Result<(), StoreError> {
        let Some(existing) = service_run::Entity::find_by_id(run_id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(());
        };
        // The reaper and stop() can both land here; the first writer wins.
        if existing.status == ProcessStatus::Stopped.to_string() {
            return Ok(());
        }

        let mut model: service_run::ActiveModel = existing.into();
        model.status = Set(ProcessStatus::Stopped.to_string());
        model.stop_time = Set(Some(stop_time.into()));
        model.exit_code = Set(exit_code);
        model.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn recent_runs(
        &self,
        service_id: &str,
        limit: u64,
    ) -> Result<Vec<ManagedProcess>, StoreError> {
        let rows = service_run::Entity::find()
            .filter(service_run::Column::ServiceId.eq(service_id))
            .order_by_desc(service_run::Column::StartTime)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ManagedProcess {
                service_id: row.service_id,
                pid: u32::try_from(row.pid).unwrap_or_default(),
                command: row.command,
                args: serde_json::from_value(row.args).unwrap_or_default(),
                status: row.status.parse().unwrap_or(ProcessStatus::Stopped),
                start_time: row.start_time.with_timezone(&Utc),
                stop_time: row.stop_time.map(|t| t.with_timezone(&Utc)),
                run_id: Some(row.id),
            })
            .collect())
    }
}
