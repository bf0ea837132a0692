// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "crawler_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub crawler_type: String,
    pub status: String,
    pub config: Json,
    pub request_config: Json,
    pub autoscaling_config: Json,
    pub session_pool_config: Json,
    pub proxy_config: Json,
    pub storage_config: Json,
    pub request_queue_config: Json,
    pub error_handling_config: Json,
    pub url_patterns: Json,
    pub selectors: Json,
    pub tags: Json,
    pub metadata: Json,
    pub stats: Json,
    pub seeds: Json,
    pub results: Json,
    pub logs: Json,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
    pub started_at: Option<ChronoDateTimeWithTimeZone>,
    pub finished_at: Option<ChronoDateTimeWithTimeZone>,
    pub last_run_at: Option<ChronoDateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
