// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::models::config_block::{parse_block, BlockKind};
use crate::domain::models::crawler_type::{
    builtin_crawler_types, fallback_crawler_type, normalize_crawler_type_record, slugify,
    CrawlerType, FALLBACK_CRAWLER_TYPE,
};
use crate::domain::repositories::config_store::{ConfigStore, RecordKind};
use crate::utils::errors::ControlError;

/// 新建爬虫类型的输入
///
/// 默认配置块可以是 JSON 对象，也可以是内容为 JSON 对象的字符串
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerTypeDraft {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub usage: Option<String>,
    pub docs_url: Option<String>,
    pub notes: Option<String>,
    pub default_config: Option<Value>,
    pub default_request_config: Option<Value>,
    pub default_url_patterns: Option<Value>,
    pub default_selectors: Option<Value>,
}

impl CrawlerTypeDraft {
    fn block_payload(&self, kind: BlockKind) -> Option<&Value> {
        match kind {
            BlockKind::Config => self.default_config.as_ref(),
            BlockKind::RequestConfig => self.default_request_config.as_ref(),
            BlockKind::UrlPatterns => self.default_url_patterns.as_ref(),
            BlockKind::Selectors => self.default_selectors.as_ref(),
            _ => None,
        }
    }
}

/// 爬虫类型注册表
///
/// 每次调用都从存储重新读取，不跨调用缓存记录。存储为空时首次读取会写入内置类型。
/// 创建操作从冲突检查到写入全程持有 `create_lock`。
pub struct CrawlerTypeRegistry {
    store: Arc<dyn ConfigStore>,
    seed_lock: Mutex<()>,
    create_lock: Mutex<()>,
}

impl CrawlerTypeRegistry {
    /// 创建新的注册表
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            seed_lock: Mutex::new(()),
            create_lock: Mutex::new(()),
        }
    }

    /// 读取全部类型，必要时写入内置类型
    async fn load(&self) -> Result<Vec<CrawlerType>, ControlError> {
        let records = self.store.read_all(RecordKind::CrawlerTypes).await?;
        if !records.is_empty() {
            return Ok(records
                .iter()
                .filter_map(normalize_crawler_type_record)
                .collect());
        }

        let _guard = self.seed_lock.lock().await;
        // Another caller may have seeded while we waited.
        let records = self.store.read_all(RecordKind::CrawlerTypes).await?;
        if !records.is_empty() {
            return Ok(records
                .iter()
                .filter_map(normalize_crawler_type_record)
                .collect());
        }

        let builtins = builtin_crawler_types(Utc::now());
        self.store
            .write_all(
                RecordKind::CrawlerTypes,
                builtins.iter().map(CrawlerType::to_document).collect(),
            )
            .await?;
        info!(
            count = builtins.len(),
            backend = self.store.backend_name(),
            "Seeded built-in crawler types"
        );
        metrics::counter!("crawler_types_seeded_total").increment(builtins.len() as u64);
        Ok(builtins)
    }

    /// 列出全部类型
    pub async fn list(&self) -> Result<Vec<CrawlerType>, ControlError> {
        self.load().await
    }

    /// 按ID获取类型
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlerType)` - 找到的类型
    /// * `Err(ControlError::NotFound)` - 类型不存在
    pub async fn get(&self, id: &str) -> Result<CrawlerType, ControlError> {
        self.load()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ControlError::not_found("crawler type", id))
    }

    /// 解析实例引用的类型
    ///
    /// 未指定或未知的类型回退到 `cheerio`；若存储中连 `cheerio` 也没有，使用内置定义
    pub async fn resolve(&self, id: Option<&str>) -> Result<CrawlerType, ControlError> {
        let types = self.load().await?;
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if let Some(found) = types.iter().find(|t| t.id == id) {
                return Ok(found.clone());
            }
            debug!(crawler_type = id, "Unknown crawler type, using fallback");
        }
        Ok(types
            .into_iter()
            .find(|t| t.id == FALLBACK_CRAWLER_TYPE)
            .unwrap_or_else(fallback_crawler_type))
    }

    /// 创建新类型
    ///
    /// # 参数
    ///
    /// * `draft` - 类型输入，`name` 与 `id` 至少提供一个
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlerType)` - 规范化后的新类型
    /// * `Err(ControlError::Validation)` - 缺少名称或配置块格式错误
    /// * `Err(ControlError::Conflict)` - slug 已存在
    pub async fn create(&self, draft: CrawlerTypeDraft) -> Result<CrawlerType, ControlError> {
        let source = draft
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| draft.name.as_deref().filter(|n| !n.trim().is_empty()))
            .ok_or_else(|| ControlError::Validation("name or id is required".to_string()))?;
        let id = slugify(source);
        if id.is_empty() {
            return Err(ControlError::Validation(format!(
                "cannot derive an id from {:?}",
                source
            )));
        }

        let now = Utc::now();
        let mut document = Map::new();
        document.insert("id".to_string(), Value::String(id.clone()));
        document.insert(
            "name".to_string(),
            Value::String(draft.name.clone().unwrap_or_else(|| id.clone())),
        );
        for (key, value) in [
            ("description", &draft.description),
            ("usage", &draft.usage),
            ("docs_url", &draft.docs_url),
            ("notes", &draft.notes),
        ] {
            if let Some(value) = value {
                document.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(features) = &draft.features {
            document.insert("features".to_string(), serde_json::json!(features));
        }
        for kind in BlockKind::ALL {
            let (Some(field), Some(payload)) = (kind.type_default_field(), draft.block_payload(kind))
            else {
                continue;
            };
            if let Some(block) = parse_block(field, payload).map_err(ControlError::Validation)? {
                document.insert(field.to_string(), Value::Object(block));
            }
        }
        document.insert("created_at".to_string(), serde_json::json!(now));
        document.insert("updated_at".to_string(), serde_json::json!(now));

        let crawler_type = normalize_crawler_type_record(&Value::Object(document))
            .ok_or_else(|| ControlError::Validation("invalid crawler type".to_string()))?;
        let conflict = || ControlError::Conflict(format!("crawler type {} already exists", id));

        let _guard = self.create_lock.lock().await;
        let existing = self.load().await?;
        if existing.iter().any(|t| t.id == id) {
            return Err(conflict());
        }
        // The store refuses to overwrite, which also covers writers in other processes.
        if !self
            .store
            .insert_new(RecordKind::CrawlerTypes, crawler_type.to_document())
            .await?
        {
            return Err(conflict());
        }

        info!(crawler_type = %crawler_type.id, "Created crawler type");
        metrics::counter!("crawler_types_created_total").increment(1);
        Ok(crawler_type)
    }
}
