// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{json, Map, Value};

/// 配置块
///
/// 爬虫类型默认值与实例配置均以 JSON 对象表示，字段集合开放
pub type ConfigBlock = Map<String, Value>;

/// 爬虫实例上的配置块种类
///
/// 每个实例记录都必须包含全部配置块的全部字段，缺失字段依次由
/// 爬虫类型默认值与全局兜底值回填
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Config,
    RequestConfig,
    AutoscalingConfig,
    SessionPoolConfig,
    ProxyConfig,
    StorageConfig,
    RequestQueueConfig,
    ErrorHandlingConfig,
    UrlPatterns,
    Selectors,
}

impl BlockKind {
    /// 全部配置块，按记录中的字段顺序排列
    pub const ALL: [BlockKind; 10] = [
        BlockKind::Config,
        BlockKind::RequestConfig,
        BlockKind::AutoscalingConfig,
        BlockKind::SessionPoolConfig,
        BlockKind::ProxyConfig,
        BlockKind::StorageConfig,
        BlockKind::RequestQueueConfig,
        BlockKind::ErrorHandlingConfig,
        BlockKind::UrlPatterns,
        BlockKind::Selectors,
    ];

    /// 实例记录中的字段名
    pub fn field_name(self) -> &'static str {
        match self {
            BlockKind::Config => "config",
            BlockKind::RequestConfig => "request_config",
            BlockKind::AutoscalingConfig => "autoscaling_config",
            BlockKind::SessionPoolConfig => "session_pool_config",
            BlockKind::ProxyConfig => "proxy_config",
            BlockKind::StorageConfig => "storage_config",
            BlockKind::RequestQueueConfig => "request_queue_config",
            BlockKind::ErrorHandlingConfig => "error_handling_config",
            BlockKind::UrlPatterns => "url_patterns",
            BlockKind::Selectors => "selectors",
        }
    }

    /// 爬虫类型上提供该块默认值的字段名，部分块没有类型级默认值
    pub fn type_default_field(self) -> Option<&'static str> {
        match self {
            BlockKind::Config => Some("default_config"),
            BlockKind::RequestConfig => Some("default_request_config"),
            BlockKind::UrlPatterns => Some("default_url_patterns"),
            BlockKind::Selectors => Some("default_selectors"),
            _ => None,
        }
    }

    /// 全局兜底值
    pub fn fallback(self) -> ConfigBlock {
        let value = match self {
            BlockKind::Config => json!({
                "maxConcurrency": 10,
                "minConcurrency": 1,
                "maxRequestsPerCrawl": 1000,
                "maxRequestRetries": 3,
                "maxCrawlDepth": 3,
                "requestHandlerTimeoutSecs": 60,
                "navigationTimeoutSecs": 30,
                "javascriptExecution": false,
                "headless": true,
                "useSessionPool": false,
                "persistCookiesPerSession": false,
                "respectRobotsTxt": true
            }),
            BlockKind::RequestConfig => json!({
                "method": "GET",
                "headers": {},
                "timeoutSecs": 30,
                "followRedirects": true,
                "maxRedirects": 10,
                "userAgent": "Mozilla/5.0 (compatible; crawlplane/1.0)"
            }),
            BlockKind::AutoscalingConfig => json!({
                "desiredConcurrency": 5,
                "scaleUpStepRatio": 0.05,
                "scaleDownStepRatio": 0.05,
                "maybeRunIntervalSecs": 0.5,
                "loggingIntervalSecs": 60
            }),
            BlockKind::SessionPoolConfig => json!({
                "enabled": false,
                "maxPoolSize": 1000,
                "sessionOptions": {
                    "maxUsageCount": 50,
                    "maxErrorScore": 3
                }
            }),
            BlockKind::ProxyConfig => json!({
                "useProxy": false,
                "proxyUrls": [],
                "rotation": "round_robin"
            }),
            BlockKind::StorageConfig => json!({
                "persistStorage": true,
                "datasetName": "default",
                "keyValueStoreName": "default"
            }),
            BlockKind::RequestQueueConfig => json!({
                "requestQueueName": "default",
                "maxRequestsPerMinute": 120,
                "priorityOrdering": true
            }),
            BlockKind::ErrorHandlingConfig => json!({
                "maxRetries": 3,
                "retryDelayMs": 1000,
                "ignoreHttpErrorStatusCodes": [],
                "saveErrorSnapshots": false
            }),
            BlockKind::UrlPatterns => json!({
                "include": [],
                "exclude": [],
                "sameDomainOnly": true
            }),
            BlockKind::Selectors => json!({
                "title": "title",
                "content": "body",
                "links": "a[href]"
            }),
        };
        into_block(value)
    }
}

/// 将 JSON 值转换为配置块，非对象值得到空块
pub fn into_block(value: Value) -> ConfigBlock {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// 深度合并
///
/// `overlay` 中的字段逐个覆盖 `base`；两侧均为对象的字段递归合并，
/// 数组与标量整体替换
pub fn deep_merge(base: &mut ConfigBlock, overlay: &ConfigBlock) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// 依次合并多个层级，后者优先
pub fn layered(layers: &[&ConfigBlock]) -> ConfigBlock {
    let mut merged = ConfigBlock::new();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}

/// 解析请求中的配置块
///
/// 接受 JSON 对象或内容为 JSON 对象的字符串；`null` 视为未提供
///
/// # 返回值
///
/// * `Ok(Some(block))` - 解析成功
/// * `Ok(None)` - 字段为 `null`
/// * `Err(String)` - 字段格式错误
pub fn parse_block(field: &str, value: &Value) -> Result<Option<ConfigBlock>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map.clone())),
        Value::String(raw) if raw.trim().is_empty() => Ok(None),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(format!("{} must be a JSON object", field)),
            Err(e) => Err(format!("{} contains malformed JSON: {}", field, e)),
        },
        _ => Err(format!("{} must be a JSON object", field)),
    }
}
