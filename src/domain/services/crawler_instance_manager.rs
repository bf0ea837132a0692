// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::models::config_block::{deep_merge, parse_block, BlockKind, ConfigBlock};
use crate::domain::models::crawler_instance::{
    normalize_instance_record, resolve_block, CrawlerInstance, CrawlerStats, CrawlerStatus, Seed,
};
use crate::domain::models::crawler_type::{fallback_crawler_type, CrawlerType, FALLBACK_CRAWLER_TYPE};
use crate::domain::repositories::config_store::{ConfigStore, RecordKind};
use crate::domain::services::crawler_type_registry::CrawlerTypeRegistry;
use crate::utils::errors::ControlError;

/// 分页默认条数
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// 分页最大条数
pub const MAX_PAGE_LIMIT: usize = 1000;

/// 新建或更新爬虫实例的输入
///
/// 更新时只有出现的字段生效；配置块可以是 JSON 对象或 JSON 字符串
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerInstanceDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub crawler_type: Option<String>,
    pub config: Option<Value>,
    pub request_config: Option<Value>,
    pub autoscaling_config: Option<Value>,
    pub session_pool_config: Option<Value>,
    pub proxy_config: Option<Value>,
    pub storage_config: Option<Value>,
    pub request_queue_config: Option<Value>,
    pub error_handling_config: Option<Value>,
    pub url_patterns: Option<Value>,
    pub selectors: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl CrawlerInstanceDraft {
    fn block_payload(&self, kind: BlockKind) -> Option<&Value> {
        match kind {
            BlockKind::Config => self.config.as_ref(),
            BlockKind::RequestConfig => self.request_config.as_ref(),
            BlockKind::AutoscalingConfig => self.autoscaling_config.as_ref(),
            BlockKind::SessionPoolConfig => self.session_pool_config.as_ref(),
            BlockKind::ProxyConfig => self.proxy_config.as_ref(),
            BlockKind::StorageConfig => self.storage_config.as_ref(),
            BlockKind::RequestQueueConfig => self.request_queue_config.as_ref(),
            BlockKind::ErrorHandlingConfig => self.error_handling_config.as_ref(),
            BlockKind::UrlPatterns => self.url_patterns.as_ref(),
            BlockKind::Selectors => self.selectors.as_ref(),
        }
    }

    /// 解析所有出现的配置块，任何一个格式错误都在写入前返回
    fn parsed_overrides(&self) -> Result<HashMap<BlockKind, ConfigBlock>, ControlError> {
        let mut overrides = HashMap::new();
        for kind in BlockKind::ALL {
            if let Some(payload) = self.block_payload(kind) {
                if let Some(block) =
                    parse_block(kind.field_name(), payload).map_err(ControlError::Validation)?
                {
                    overrides.insert(kind, block);
                }
            }
        }
        Ok(overrides)
    }
}

/// 种子输入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedInput {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(rename = "userData", default)]
    pub user_data: Option<Map<String, Value>>,
}

impl SeedInput {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// 分页参数
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T: Clone> Page<T> {
    fn slice(all: &[T], request: PageRequest) -> Self {
        let limit = request
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = request.offset.unwrap_or(0);
        let items = all.iter().skip(offset).take(limit).cloned().collect();
        Self {
            items,
            total: all.len(),
            offset,
            limit,
        }
    }
}

/// 爬虫实例管理器
///
/// 负责实例的增删改查、类型默认值与实例覆盖值的合并，以及
/// idle/running/paused 三态生命周期。每个操作都先从存储读取再修改，
/// 进程内的修改操作串行执行。
pub struct CrawlerInstanceManager {
    store: Arc<dyn ConfigStore>,
    types: Arc<CrawlerTypeRegistry>,
    strict_transitions: bool,
    write_lock: Mutex<()>,
}

impl CrawlerInstanceManager {
    /// 创建新的实例管理器
    ///
    /// # 参数
    ///
    /// * `store` - 配置存储
    /// * `types` - 爬虫类型注册表
    /// * `strict_transitions` - 是否拒绝非法的状态迁移
    pub fn new(
        store: Arc<dyn ConfigStore>,
        types: Arc<CrawlerTypeRegistry>,
        strict_transitions: bool,
    ) -> Self {
        Self {
            store,
            types,
            strict_transitions,
            write_lock: Mutex::new(()),
        }
    }

    /// 列出全部实例
    pub async fn list(&self) -> Result<Vec<CrawlerInstance>, ControlError> {
        let records = self.store.read_all(RecordKind::CrawlerInstances).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let types = self.types.list().await?;
        Ok(records
            .iter()
            .filter_map(|raw| {
                let crawler_type = type_for(&types, raw.get("type").and_then(Value::as_str));
                normalize_instance_record(raw, &crawler_type)
            })
            .collect())
    }

    /// 按ID获取实例
    pub async fn get(&self, id: &str) -> Result<CrawlerInstance, ControlError> {
        let raw = self
            .store
            .find(RecordKind::CrawlerInstances, id)
            .await?
            .ok_or_else(|| ControlError::not_found("crawler", id))?;
        let crawler_type = self
            .types
            .resolve(raw.get("type").and_then(Value::as_str))
            .await?;
        normalize_instance_record(&raw, &crawler_type)
            .ok_or_else(|| ControlError::not_found("crawler", id))
    }

    async fn save(&self, instance: &CrawlerInstance) -> Result<(), ControlError> {
        self.store
            .upsert(RecordKind::CrawlerInstances, instance.to_document())
            .await?;
        Ok(())
    }

    /// 创建实例
    ///
    /// 每个配置块按 全局兜底值 ← 类型默认值 ← 实例覆盖值 逐字段合并；
    /// 未提供 tags 时取类型的 features
    pub async fn create(&self, draft: CrawlerInstanceDraft) -> Result<CrawlerInstance, ControlError> {
        let overrides = draft.parsed_overrides()?;
        let crawler_type = self.types.resolve(draft.crawler_type.as_deref()).await?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let block = |kind: BlockKind| resolve_block(kind, &crawler_type, overrides.get(&kind));

        let instance = CrawlerInstance {
            name: draft
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("{} crawler", crawler_type.name)),
            description: draft.description.clone().unwrap_or_default(),
            crawler_type: crawler_type.id.clone(),
            status: CrawlerStatus::Idle,
            config: block(BlockKind::Config),
            request_config: block(BlockKind::RequestConfig),
            autoscaling_config: block(BlockKind::AutoscalingConfig),
            session_pool_config: block(BlockKind::SessionPoolConfig),
            proxy_config: block(BlockKind::ProxyConfig),
            storage_config: block(BlockKind::StorageConfig),
            request_queue_config: block(BlockKind::RequestQueueConfig),
            error_handling_config: block(BlockKind::ErrorHandlingConfig),
            url_patterns: block(BlockKind::UrlPatterns),
            selectors: block(BlockKind::Selectors),
            tags: draft
                .tags
                .clone()
                .unwrap_or_else(|| crawler_type.features.clone()),
            metadata: draft.metadata.clone().unwrap_or_default(),
            stats: CrawlerStats::default(),
            seeds: Vec::new(),
            results: Vec::new(),
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            last_run_at: None,
            id,
        };

        let _guard = self.write_lock.lock().await;
        self.save(&instance).await?;

        metrics::counter!("crawler_instances_created_total").increment(1);
        info!(crawler = %instance.id, crawler_type = %instance.crawler_type, "Created crawler");
        Ok(instance)
    }

    /// 更新实例
    ///
    /// 类型变化时先在新类型下重新合并默认值，再应用本次提供的覆盖字段；
    /// 否则把覆盖字段逐字段合并进现有配置块。
    pub async fn update(
        &self,
        id: &str,
        draft: CrawlerInstanceDraft,
    ) -> Result<CrawlerInstance, ControlError> {
        let overrides = draft.parsed_overrides()?;

        let _guard = self.write_lock.lock().await;
        let mut instance = self.get(id).await?;

        let requested = draft.crawler_type.as_deref().filter(|t| !t.is_empty());
        let mut type_change = None;
        if let Some(requested) = requested {
            // Unknown ids resolve to the fallback type, which may be the current one.
            let resolved = self.types.resolve(Some(requested)).await?;
            if resolved.id != instance.crawler_type {
                type_change = Some(resolved);
            }
        }
        if let Some(crawler_type) = type_change {
            for kind in BlockKind::ALL {
                *instance.block_mut(kind) =
                    resolve_block(kind, &crawler_type, overrides.get(&kind));
            }
            debug!(crawler = id, from = %instance.crawler_type, to = %crawler_type.id, "Crawler type changed");
            instance.crawler_type = crawler_type.id;
        } else {
            for (kind, block) in &overrides {
                deep_merge(instance.block_mut(*kind), block);
            }
        }

        if let Some(name) = draft.name.filter(|n| !n.trim().is_empty()) {
            instance.name = name;
        }
        if let Some(description) = draft.description {
            instance.description = description;
        }
        if let Some(tags) = draft.tags {
            instance.tags = tags;
        }
        if let Some(metadata) = draft.metadata {
            instance.metadata = metadata;
        }
        instance.updated_at = Utc::now();

        self.save(&instance).await?;
        info!(crawler = id, "Updated crawler");
        Ok(instance)
    }

    fn guard(
        &self,
        instance: &CrawlerInstance,
        action: &'static str,
        allowed: &[CrawlerStatus],
    ) -> Result<(), ControlError> {
        if self.strict_transitions && !allowed.contains(&instance.status) {
            return Err(ControlError::InvalidTransition {
                id: instance.id.clone(),
                action,
                from: instance.status,
            });
        }
        Ok(())
    }

    /// 读取、校验、修改并保存实例
    async fn transition<F>(
        &self,
        id: &str,
        action: &'static str,
        allowed: &[CrawlerStatus],
        apply: F,
    ) -> Result<CrawlerInstance, ControlError>
    where
        F: FnOnce(&mut CrawlerInstance),
    {
        let _guard = self.write_lock.lock().await;
        let mut instance = self.get(id).await?;
        self.guard(&instance, action, allowed)?;

        let from = instance.status;
        apply(&mut instance);
        self.save(&instance).await?;

        metrics::counter!("crawler_transitions_total", "action" => action).increment(1);
        info!(crawler = id, action, %from, to = %instance.status, "Crawler transition");
        Ok(instance)
    }

    /// 启动实例
    ///
    /// 从任何状态都可以启动（重新装载）。种子追加到已有种子之后，不替换。
    pub async fn start(&self, id: &str, seeds: Vec<SeedInput>) -> Result<CrawlerInstance, ControlError> {
        validate_seeds(&seeds)?;
        let now = Utc::now();
        let seeds = into_seeds(seeds, now);
        self.transition(
            id,
            "start",
            &[CrawlerStatus::Idle, CrawlerStatus::Running, CrawlerStatus::Paused],
            move |instance| {
                instance.status = CrawlerStatus::Running;
                instance.started_at = Some(now);
                instance.last_run_at = Some(now);
                instance.updated_at = now;
                instance.seeds.extend(seeds);
            },
        )
        .await
    }

    /// 暂停实例
    pub async fn pause(&self, id: &str) -> Result<CrawlerInstance, ControlError> {
        self.transition(id, "pause", &[CrawlerStatus::Running], |instance| {
            instance.status = CrawlerStatus::Paused;
            instance.updated_at = Utc::now();
        })
        .await
    }

    /// 恢复实例
    pub async fn resume(&self, id: &str) -> Result<CrawlerInstance, ControlError> {
        self.transition(id, "resume", &[CrawlerStatus::Paused], |instance| {
            instance.status = CrawlerStatus::Running;
            instance.updated_at = Utc::now();
        })
        .await
    }

    /// 停止实例
    ///
    /// 只修改状态字段，不会通知外部执行引擎
    pub async fn stop(&self, id: &str) -> Result<CrawlerInstance, ControlError> {
        self.transition(
            id,
            "stop",
            &[CrawlerStatus::Running, CrawlerStatus::Paused],
            |instance| {
                let now = Utc::now();
                instance.status = CrawlerStatus::Idle;
                instance.finished_at = Some(now);
                instance.updated_at = now;
            },
        )
        .await
    }

    /// 追加种子
    pub async fn add_seeds(
        &self,
        id: &str,
        seeds: Vec<SeedInput>,
    ) -> Result<CrawlerInstance, ControlError> {
        validate_seeds(&seeds)?;

        let _guard = self.write_lock.lock().await;
        let mut instance = self.get(id).await?;
        let now = Utc::now();
        let added = seeds.len();
        instance.seeds.extend(into_seeds(seeds, now));
        instance.updated_at = now;
        self.save(&instance).await?;

        metrics::counter!("crawler_seeds_added_total").increment(added as u64);
        debug!(crawler = id, added, total = instance.seeds.len(), "Added seeds");
        Ok(instance)
    }

    /// 删除实例
    pub async fn delete(&self, id: &str) -> Result<(), ControlError> {
        let _guard = self.write_lock.lock().await;
        if !self.store.remove(RecordKind::CrawlerInstances, id).await? {
            return Err(ControlError::not_found("crawler", id));
        }
        metrics::counter!("crawler_instances_deleted_total").increment(1);
        info!(crawler = id, "Deleted crawler");
        Ok(())
    }

    /// 分页读取抓取结果
    pub async fn results(&self, id: &str, page: PageRequest) -> Result<Page<Value>, ControlError> {
        let instance = self.get(id).await?;
        Ok(Page::slice(&instance.results, page))
    }

    /// 分页读取运行日志
    pub async fn logs(&self, id: &str, page: PageRequest) -> Result<Page<Value>, ControlError> {
        let instance = self.get(id).await?;
        Ok(Page::slice(&instance.logs, page))
    }

    /// 读取执行统计
    pub async fn stats(&self, id: &str) -> Result<CrawlerStats, ControlError> {
        Ok(self.get(id).await?.stats)
    }

    /// 生成实例配置模板
    ///
    /// 指定的类型不存在时返回 NotFound；未指定时使用兜底类型
    pub async fn config_template(&self, type_id: Option<&str>) -> Result<Value, ControlError> {
        let crawler_type = match type_id.filter(|t| !t.is_empty()) {
            Some(type_id) => self.types.get(type_id).await?,
            None => self.types.resolve(None).await?,
        };

        let mut template = Map::new();
        template.insert("name".to_string(), Value::String(String::new()));
        template.insert("description".to_string(), Value::String(String::new()));
        template.insert("type".to_string(), Value::String(crawler_type.id.clone()));
        for kind in BlockKind::ALL {
            template.insert(
                kind.field_name().to_string(),
                Value::Object(resolve_block(kind, &crawler_type, None)),
            );
        }
        template.insert("tags".to_string(), serde_json::json!(crawler_type.features));
        template.insert("metadata".to_string(), Value::Object(Map::new()));
        Ok(Value::Object(template))
    }
}

fn type_for(types: &[CrawlerType], id: Option<&str>) -> CrawlerType {
    let by_id = |wanted: &str| types.iter().find(|t| t.id == wanted).cloned();
    id.and_then(by_id)
        .or_else(|| by_id(FALLBACK_CRAWLER_TYPE))
        .unwrap_or_else(fallback_crawler_type)
}

fn validate_seeds(seeds: &[SeedInput]) -> Result<(), ControlError> {
    if let Some(position) = seeds.iter().position(|s| s.url.trim().is_empty()) {
        return Err(ControlError::Validation(format!(
            "seed at index {} has no url",
            position
        )));
    }
    Ok(())
}

fn into_seeds(seeds: Vec<SeedInput>, added_at: DateTime<Utc>) -> Vec<Seed> {
    seeds
        .into_iter()
        .map(|s| Seed::pending(s.url.trim().to_string(), s.label, s.priority, s.user_data, added_at))
        .collect()
}
