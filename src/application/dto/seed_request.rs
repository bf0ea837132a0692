// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::services::crawler_instance_manager::SeedInput;

/// 单个种子，既可以是 URL 字符串也可以是完整对象
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedEntryDto {
    Url(String),
    Detailed(SeedInput),
}

impl From<SeedEntryDto> for SeedInput {
    fn from(entry: SeedEntryDto) -> Self {
        match entry {
            SeedEntryDto::Url(url) => SeedInput::from_url(url),
            SeedEntryDto::Detailed(seed) => seed,
        }
    }
}

/// 启动爬虫请求，种子可省略
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StartCrawlerRequestDto {
    #[serde(default, alias = "seedUrls")]
    #[validate(length(max = 10000))]
    pub seeds: Vec<SeedEntryDto>,
}

impl StartCrawlerRequestDto {
    pub fn into_seeds(self) -> Vec<SeedInput> {
        self.seeds.into_iter().map(SeedInput::from).collect()
    }
}

/// 追加种子请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddSeedsRequestDto {
    #[serde(alias = "seedUrls")]
    #[validate(length(min = 1, max = 10000))]
    pub seeds: Vec<SeedEntryDto>,
}

impl AddSeedsRequestDto {
    pub fn into_seeds(self) -> Vec<SeedInput> {
        self.seeds.into_iter().map(SeedInput::from).collect()
    }
}
