// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::info;

use crate::config::settings::{Settings, StorageBackend};
use crate::domain::repositories::config_store::ConfigStore;
use crate::domain::repositories::process_run_repository::ProcessRunRepository;
use crate::infrastructure::database::connection::create_pool;
use crate::infrastructure::repositories::file_store::FileStore;
use crate::infrastructure::repositories::process_run_repo_impl::ProcessRunRepositoryImpl;
use crate::infrastructure::repositories::relational_store::RelationalStore;

/// 持久化组件
///
/// 运行记录仓库只在关系型后端下存在
pub struct Persistence {
    pub config_store: Arc<dyn ConfigStore>,
    pub process_runs: Option<Arc<dyn ProcessRunRepository>>,
}

/// 按配置创建存储
///
/// 启动时调用一次；关系型后端会先执行数据库迁移。上层只依赖返回的特质对象。
pub async fn create_config_store(settings: &Settings) -> Result<Persistence> {
    match settings.storage.backend {
        StorageBackend::File => {
            let store = FileStore::new(settings.storage.data_dir.clone());
            info!(data_dir = %store.data_dir().display(), "Using file storage backend");
            Ok(Persistence {
                config_store: Arc::new(store),
                process_runs: None,
            })
        }
        StorageBackend::Postgres => {
            let db = create_pool(&settings.database)
                .await
                .context("Failed to connect to database")?;
            Migrator::up(&db, None)
                .await
                .context("Failed to run database migrations")?;
            info!("Using relational storage backend");

            let db = Arc::new(db);
            Ok(Persistence {
                config_store: Arc::new(RelationalStore::new(db.clone())),
                process_runs: Some(Arc::new(ProcessRunRepositoryImpl::new(db))),
            })
        }
    }
}
