// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;

use crate::domain::services::crawler_instance_manager::PageRequest;

/// 结果与日志分页查询参数
///
/// 超出范围的 `limit` 会被截断到 1..=1000，而不是拒绝
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQueryDto {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl From<PageQueryDto> for PageRequest {
    fn from(query: PageQueryDto) -> Self {
        Self {
            offset: query.offset,
            limit: query.limit,
        }
    }
}

/// 配置模板查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigTemplateQueryDto {
    #[serde(rename = "type")]
    pub crawler_type: Option<String>,
}

/// 服务运行记录查询参数
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RunsQueryDto {
    pub limit: Option<u64>,
}

impl RunsQueryDto {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 200;

    /// 截断到 1..=200
    pub fn effective_limit(&self) -> u64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
