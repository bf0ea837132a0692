// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::domain::repositories::config_store::{record_id, ConfigStore, RecordKind, StoreError};
use crate::infrastructure::database::entities::{
    crawler_instance as instance_entity, crawler_type as type_entity,
};

/// 关系型存储
///
/// 标量字段映射为普通列，配置块、种子、结果与日志映射为 JSON 列。
/// 读出的文档与文件后端的记录形状一致。
pub struct RelationalStore {
    db: Arc<DatabaseConnection>,
}

impl RelationalStore {
    /// 创建新的关系型存储
    ///
    /// # 参数
    ///
    /// * `db` - 已完成迁移的数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn as_object(record: &Value) -> Result<&Map<String, Value>, StoreError> {
    record
        .as_object()
        .ok_or_else(|| StoreError::Malformed("record is not a JSON object".to_string()))
}

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn json_or(map: &Map<String, Value>, key: &str, default: Value) -> Value {
    match map.get(key) {
        Some(Value::Null) | None => default,
        Some(value) => value.clone(),
    }
}

fn timestamp(map: &Map<String, Value>, key: &str) -> Option<DateTime<FixedOffset>> {
    map.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

fn utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

fn type_active_model(record: &Value) -> Result<type_entity::ActiveModel, StoreError> {
    let map = as_object(record)?;
    let id = record_id(record)
        .ok_or_else(|| StoreError::Malformed("record has no id".to_string()))?;
    let now: DateTime<FixedOffset> = Utc::now().into();
    let created_at = timestamp(map, "created_at").unwrap_or(now);

    Ok(type_entity::ActiveModel {
        id: Set(id.to_string()),
        name: Set(text(map, "name")),
        description: Set(text(map, "description")),
        features: Set(json_or(map, "features", json!([]))),
        usage: Set(text(map, "usage")),
        docs_url: Set(text(map, "docs_url")),
        notes: Set(text(map, "notes")),
        default_config: Set(json_or(map, "default_config", json!({}))),
        default_request_config: Set(json_or(map, "default_request_config", json!({}))),
        default_url_patterns: Set(json_or(map, "default_url_patterns", json!({}))),
        default_selectors: Set(json_or(map, "default_selectors", json!({}))),
        created_at: Set(created_at),
        updated_at: Set(timestamp(map, "updated_at").unwrap_or(created_at)),
    })
}

fn type_document(model: type_entity::Model) -> Value {
    json!({
        "id": model.id,
        "name": model.name,
        "description": model.description,
        "features": model.features,
        "usage": model.usage,
        "docs_url": model.docs_url,
        "notes": model.notes,
        "default_config": model.default_config,
        "default_request_config": model.default_request_config,
        "default_url_patterns": model.default_url_patterns,
        "default_selectors": model.default_selectors,
        "created_at": utc(model.created_at),
        "updated_at": utc(model.updated_at),
    })
}

fn instance_active_model(record: &Value) -> Result<instance_entity::ActiveModel, StoreError> {
    let map = as_object(record)?;
    let id = record_id(record)
        .ok_or_else(|| StoreError::Malformed("record has no id".to_string()))?;
    let now: DateTime<FixedOffset> = Utc::now().into();
    let created_at = timestamp(map, "created_at").unwrap_or(now);
    let object = |key: &str| json_or(map, key, json!({}));
    let array = |key: &str| json_or(map, key, json!([]));

    Ok(instance_entity::ActiveModel {
        id: Set(id.to_string()),
        name: Set(text(map, "name")),
        description: Set(text(map, "description")),
        crawler_type: Set(text(map, "type")),
        status: Set(map
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("idle")
            .to_string()),
        config: Set(object("config")),
        request_config: Set(object("request_config")),
        autoscaling_config: Set(object("autoscaling_config")),
        session_pool_config: Set(object("session_pool_config")),
        proxy_config: Set(object("proxy_config")),
        storage_config: Set(object("storage_config")),
        request_queue_config: Set(object("request_queue_config")),
        error_handling_config: Set(object("error_handling_config")),
        url_patterns: Set(object("url_patterns")),
        selectors: Set(object("selectors")),
        tags: Set(array("tags")),
        metadata: Set(object("metadata")),
        stats: Set(object("stats")),
        seeds: Set(array("seeds")),
        results: Set(array("results")),
        logs: Set(array("logs")),
        created_at: Set(created_at),
        updated_at: Set(timestamp(map, "updated_at").unwrap_or(created_at)),
        started_at: Set(timestamp(map, "started_at")),
        finished_at: Set(timestamp(map, "finished_at")),
        last_run_at: Set(timestamp(map, "last_run_at")),
    })
}

fn instance_document(model: instance_entity::Model) -> Value {
    json!({
        "id": model.id,
        "name": model.name,
        "description": model.description,
        "type": model.crawler_type,
        "status": model.status,
        "config": model.config,
        "request_config": model.request_config,
        "autoscaling_config": model.autoscaling_config,
        "session_pool_config": model.session_pool_config,
        "proxy_config": model.proxy_config,
        "storage_config": model.storage_config,
        "request_queue_config": model.request_queue_config,
        "error_handling_config": model.error_handling_config,
        "url_patterns": model.url_patterns,
        "selectors": model.selectors,
        "tags": model.tags,
        "metadata": model.metadata,
        "stats": model.stats,
        "seeds": model.seeds,
        "results": model.results,
        "logs": model.logs,
        "created_at": utc(model.created_at),
        "updated_at": utc(model.updated_at),
        "started_at": model.started_at.map(utc),
        "finished_at": model.finished_at.map(utc),
        "last_run_at": model.last_run_at.map(utc),
    })
}

fn type_conflict() -> OnConflict {
    OnConflict::column(type_entity::Column::Id)
        .update_columns([
            type_entity::Column::Name,
            type_entity::Column::Description,
            type_entity::Column::Features,
            type_entity::Column::Usage,
            type_entity::Column::DocsUrl,
            type_entity::Column::Notes,
            type_entity::Column::DefaultConfig,
            type_entity::Column::DefaultRequestConfig,
            type_entity::Column::DefaultUrlPatterns,
            type_entity::Column::DefaultSelectors,
            type_entity::Column::UpdatedAt,
        ])
        .to_owned()
}

fn instance_conflict() -> OnConflict {
    // Every column except the key and created_at is rewritten.
    let columns = instance_entity::Column::iter().filter(|c| {
        !matches!(
            c,
            instance_entity::Column::Id | instance_entity::Column::CreatedAt
        )
    });
    OnConflict::column(instance_entity::Column::Id)
        .update_columns(columns)
        .to_owned()
}

async fn upsert_with<C: ConnectionTrait>(
    db: &C,
    kind: RecordKind,
    record: &Value,
) -> Result<(), StoreError> {
    match kind {
        RecordKind::CrawlerTypes => {
            type_entity::Entity::insert(type_active_model(record)?)
                .on_conflict(type_conflict())
                .exec_without_returning(db)
                .await?;
        }
        RecordKind::CrawlerInstances => {
            instance_entity::Entity::insert(instance_active_model(record)?)
                .on_conflict(instance_conflict())
                .exec_without_returning(db)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl ConfigStore for RelationalStore {
    async fn read_all(&self, kind: RecordKind) -> Result<Vec<Value>, StoreError> {
        let db = self.db.as_ref();
        let records = match kind {
            RecordKind::CrawlerTypes => type_entity::Entity::find()
                .order_by_asc(type_entity::Column::CreatedAt)
                .order_by_asc(type_entity::Column::Id)
                .all(db)
                .await?
                .into_iter()
                .map(type_document)
                .collect(),
            RecordKind::CrawlerInstances => instance_entity::Entity::find()
                .order_by_asc(instance_entity::Column::CreatedAt)
                .order_by_asc(instance_entity::Column::Id)
                .all(db)
                .await?
                .into_iter()
                .map(instance_document)
                .collect(),
        };
        Ok(records)
    }

    async fn write_all(&self, kind: RecordKind, records: Vec<Value>) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        match kind {
            RecordKind::CrawlerTypes => {
                type_entity::Entity::delete_many().exec(&txn).await?;
            }
            RecordKind::CrawlerInstances => {
                instance_entity::Entity::delete_many().exec(&txn).await?;
            }
        }
        for record in &records {
            upsert_with(&txn, kind, record).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn upsert(&self, kind: RecordKind, record: Value) -> Result<(), StoreError> {
        upsert_with(self.db.as_ref(), kind, &record).await
    }

    async fn insert_new(&self, kind: RecordKind, record: Value) -> Result<bool, StoreError> {
        let db = self.db.as_ref();
        let inserted = match kind {
            RecordKind::CrawlerTypes => {
                type_entity::Entity::insert(type_active_model(&record)?)
                    .on_conflict(
                        OnConflict::column(type_entity::Column::Id)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(db)
                    .await?
            }
            RecordKind::CrawlerInstances => {
                instance_entity::Entity::insert(instance_active_model(&record)?)
                    .on_conflict(
                        OnConflict::column(instance_entity::Column::Id)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(db)
                    .await?
            }
        };
        Ok(inserted > 0)
    }

    async fn find(&self, kind: RecordKind, id: &str) -> Result<Option<Value>, StoreError> {
        let db = self.db.as_ref();
        let record = match kind {
            RecordKind::CrawlerTypes => type_entity::Entity::find_by_id(id.to_string())
                .one(db)
                .await?
                .map(type_document),
            RecordKind::CrawlerInstances => instance_entity::Entity::find_by_id(id.to_string())
                .one(db)
                .await?
                .map(instance_document),
        };
        Ok(record)
    }

    async fn remove(&self, kind: RecordKind, id: &str) -> Result<bool, StoreError> {
        let db = self.db.as_ref();
        let result = match kind {
            RecordKind::CrawlerTypes => {
                type_entity::Entity::delete_by_id(id.to_string())
                    .exec(db)
                    .await?
            }
            RecordKind::CrawlerInstances => {
                instance_entity::Entity::delete_by_id(id.to_string())
                    .exec(db)
                    .await?
            }
        };
        Ok(result.rows_affected > 0)
    }

    fn backend_name(&self) -> &'static str {
        "relational"
    }
}
