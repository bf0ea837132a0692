// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::config_block::{deep_merge, BlockKind, ConfigBlock};
use super::crawler_type::{string_list, time_field, CrawlerType};

/// 爬虫实例
///
/// 由爬虫类型派生的具体抓取任务。规范化后的记录总是包含全部配置块的全部字段。
/// `results`、`logs` 与 `stats` 由外部执行引擎写入，本系统只读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerInstance {
    /// 实例ID
    pub id: String,
    /// 名称
    pub name: String,
    /// 描述
    pub description: String,
    /// 所属爬虫类型ID
    #[serde(rename = "type")]
    pub crawler_type: String,
    /// 生命周期状态
    pub status: CrawlerStatus,
    pub config: ConfigBlock,
    pub request_config: ConfigBlock,
    pub autoscaling_config: ConfigBlock,
    pub session_pool_config: ConfigBlock,
    pub proxy_config: ConfigBlock,
    pub storage_config: ConfigBlock,
    pub request_queue_config: ConfigBlock,
    pub error_handling_config: ConfigBlock,
    pub url_patterns: ConfigBlock,
    pub selectors: ConfigBlock,
    /// 标签
    pub tags: Vec<String>,
    /// 自由元数据
    pub metadata: Map<String, Value>,
    /// 执行统计
    pub stats: CrawlerStats,
    /// 种子队列（只追加）
    pub seeds: Vec<Seed>,
    /// 抓取结果
    pub results: Vec<Value>,
    /// 运行日志
    pub logs: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl CrawlerInstance {
    /// 获取配置块
    pub fn block(&self, kind: BlockKind) -> &ConfigBlock {
        match kind {
            BlockKind::Config => &self.config,
            BlockKind::RequestConfig => &self.request_config,
            BlockKind::AutoscalingConfig => &self.autoscaling_config,
            BlockKind::SessionPoolConfig => &self.session_pool_config,
            BlockKind::ProxyConfig => &self.proxy_config,
            BlockKind::StorageConfig => &self.storage_config,
            BlockKind::RequestQueueConfig => &self.request_queue_config,
            BlockKind::ErrorHandlingConfig => &self.error_handling_config,
            BlockKind::UrlPatterns => &self.url_patterns,
            BlockKind::Selectors => &self.selectors,
        }
    }

    /// 获取可变配置块
    pub fn block_mut(&mut self, kind: BlockKind) -> &mut ConfigBlock {
        match kind {
            BlockKind::Config => &mut self.config,
            BlockKind::RequestConfig => &mut self.request_config,
            BlockKind::AutoscalingConfig => &mut self.autoscaling_config,
            BlockKind::SessionPoolConfig => &mut self.session_pool_config,
            BlockKind::ProxyConfig => &mut self.proxy_config,
            BlockKind::StorageConfig => &mut self.storage_config,
            BlockKind::RequestQueueConfig => &mut self.request_queue_config,
            BlockKind::ErrorHandlingConfig => &mut self.error_handling_config,
            BlockKind::UrlPatterns => &mut self.url_patterns,
            BlockKind::Selectors => &mut self.selectors,
        }
    }

    /// 转换为存储文档
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// 爬虫实例状态
///
/// idle --start--> running --pause--> paused --resume--> running --stop--> idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerStatus {
    /// 空闲
    #[default]
    Idle,
    /// 运行中
    Running,
    /// 已暂停
    Paused,
}

impl fmt::Display for CrawlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlerStatus::Idle => write!(f, "idle"),
            CrawlerStatus::Running => write!(f, "running"),
            CrawlerStatus::Paused => write!(f, "paused"),
        }
    }
}

impl FromStr for CrawlerStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(CrawlerStatus::Idle),
            "running" => Ok(CrawlerStatus::Running),
            "paused" => Ok(CrawlerStatus::Paused),
            _ => Err(()),
        }
    }
}

/// 执行统计
///
/// 执行引擎写入的额外字段保存在 `extra` 中，读写时原样保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerStats {
    #[serde(default)]
    pub requests_total: u64,
    #[serde(default)]
    pub requests_finished: u64,
    #[serde(default)]
    pub requests_failed: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 种子状态，状态推进由执行引擎负责
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeedStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// 种子URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub status: SeedStatus,
    pub added_at: DateTime<Utc>,
    #[serde(rename = "userData", default)]
    pub user_data: Map<String, Value>,
}

impl Seed {
    /// 创建待处理种子
    pub fn pending(
        url: String,
        label: Option<String>,
        priority: Option<i64>,
        user_data: Option<Map<String, Value>>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url,
            label,
            priority: priority.unwrap_or(0),
            status: SeedStatus::Pending,
            added_at,
            user_data: user_data.unwrap_or_default(),
        }
    }
}

/// 宽松解析单个种子：字符串视为URL，缺失字段取默认值，没有URL的条目丢弃
fn normalize_seed(raw: &Value, fallback_time: DateTime<Utc>) -> Option<Seed> {
    match raw {
        Value::String(url) if !url.is_empty() => {
            Some(Seed::pending(url.clone(), None, None, None, fallback_time))
        }
        Value::Object(map) => {
            let url = map.get("url").and_then(Value::as_str)?.to_string();
            if url.is_empty() {
                return None;
            }
            Some(Seed {
                url,
                label: map.get("label").and_then(Value::as_str).map(str::to_string),
                priority: map.get("priority").and_then(Value::as_i64).unwrap_or(0),
                status: map
                    .get("status")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                added_at: time_field(map, "added_at").unwrap_or(fallback_time),
                user_data: map
                    .get("userData")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            })
        }
        _ => None,
    }
}

/// 按 兜底值 ← 类型默认值 ← 覆盖值 的顺序构造配置块
pub fn resolve_block(
    kind: BlockKind,
    crawler_type: &CrawlerType,
    overrides: Option<&ConfigBlock>,
) -> ConfigBlock {
    let mut block = kind.fallback();
    if let Some(defaults) = crawler_type.default_block(kind) {
        deep_merge(&mut block, defaults);
    }
    if let Some(overrides) = overrides {
        deep_merge(&mut block, overrides);
    }
    block
}

/// 规范化爬虫实例记录
///
/// 缺少 `id` 的记录返回 `None`。其余缺失字段按所属类型回填，保证记录形状完整。
pub fn normalize_instance_record(raw: &Value, crawler_type: &CrawlerType) -> Option<CrawlerInstance> {
    let map = raw.as_object()?;
    let id = map
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())?
        .to_string();

    let created_at = time_field(map, "created_at").unwrap_or_default();
    let updated_at = time_field(map, "updated_at").unwrap_or(created_at);

    let block_of = |kind: BlockKind| {
        let stored = map.get(kind.field_name()).and_then(Value::as_object);
        resolve_block(kind, crawler_type, stored)
    };

    Some(CrawlerInstance {
        name: map
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| id.clone()),
        description: map
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        crawler_type: map
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| crawler_type.id.clone()),
        status: map
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        config: block_of(BlockKind::Config),
        request_config: block_of(BlockKind::RequestConfig),
        autoscaling_config: block_of(BlockKind::AutoscalingConfig),
        session_pool_config: block_of(BlockKind::SessionPoolConfig),
        proxy_config: block_of(BlockKind::ProxyConfig),
        storage_config: block_of(BlockKind::StorageConfig),
        request_queue_config: block_of(BlockKind::RequestQueueConfig),
        error_handling_config: block_of(BlockKind::ErrorHandlingConfig),
        url_patterns: block_of(BlockKind::UrlPatterns),
        selectors: block_of(BlockKind::Selectors),
        tags: map.get("tags").and_then(string_list).unwrap_or_default(),
        metadata: map
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        stats: map
            .get("stats")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default(),
        seeds: map
            .get("seeds")
            .and_then(Value::as_array)
            .map(|seeds| {
                seeds
                    .iter()
                    .filter_map(|seed| normalize_seed(seed, created_at))
                    .collect()
            })
            .unwrap_or_default(),
        results: map
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        logs: map
            .get("logs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        created_at,
        updated_at,
        started_at: time_field(map, "started_at"),
        finished_at: time_field(map, "finished_at"),
        last_run_at: time_field(map, "last_run_at"),
        id,
    })
}
