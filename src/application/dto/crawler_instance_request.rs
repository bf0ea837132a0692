// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::domain::services::crawler_instance_manager::CrawlerInstanceDraft;

/// 新建或更新爬虫实例请求
///
/// 配置块保持原样传递，对象与 JSON 字符串的解析在领域层完成
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CrawlerInstanceRequestDto {
    #[validate(length(max = 256))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 128))]
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
    #[validate(length(max = 64))]
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl From<CrawlerInstanceRequestDto> for CrawlerInstanceDraft {
    fn from(dto: CrawlerInstanceRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            crawler_type: dto.crawler_type,
            config: dto.config,
            request_config: dto.request_config,
            autoscaling_config: dto.autoscaling_config,
            session_pool_config: dto.session_pool_config,
            proxy_config: dto.proxy_config,
            storage_config: dto.storage_config,
            request_queue_config: dto.request_queue_config,
            error_handling_config: dto.error_handling_config,
            url_patterns: dto.url_patterns,
            selectors: dto.selectors,
            tags: dto.tags,
            metadata: dto.metadata,
        }
    }
}
