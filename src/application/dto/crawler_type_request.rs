// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::domain::services::crawler_type_registry::CrawlerTypeDraft;

/// 新建爬虫类型请求
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_identity"))]
pub struct CreateCrawlerTypeRequestDto {
    #[validate(length(max = 128))]
    pub id: Option<String>,
    #[validate(length(max = 256))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub usage: Option<String>,
    #[validate(url)]
    pub docs_url: Option<String>,
    pub notes: Option<String>,
    pub default_config: Option<Value>,
    pub default_request_config: Option<Value>,
    pub default_url_patterns: Option<Value>,
    pub default_selectors: Option<Value>,
}

fn validate_identity(dto: &CreateCrawlerTypeRequestDto) -> Result<(), ValidationError> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if present(&dto.id) || present(&dto.name) {
        Ok(())
    } else {
        Err(ValidationError::new("name_or_id_required"))
    }
}

impl From<CreateCrawlerTypeRequestDto> for CrawlerTypeDraft {
    fn from(dto: CreateCrawlerTypeRequestDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            features: dto.features,
            usage: dto.usage,
            docs_url: dto.docs_url,
            notes: dto.notes,
            default_config: dto.default_config,
            default_request_config: dto.default_request_config,
            default_url_patterns: dto.default_url_patterns,
            default_selectors: dto.default_selectors,
        }
    }
}
