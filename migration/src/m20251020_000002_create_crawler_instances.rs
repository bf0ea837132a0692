// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 爬虫实例表迁移
///
/// 所有配置块、种子、结果与日志均以 JSON 列存储，与文件后端保持相同的记录形状
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let json_columns = [
            CrawlerInstances::Config,
            CrawlerInstances::RequestConfig,
            CrawlerInstances::AutoscalingConfig,
            CrawlerInstances::SessionPoolConfig,
            CrawlerInstances::ProxyConfig,
            CrawlerInstances::StorageConfig,
            CrawlerInstances::RequestQueueConfig,
            CrawlerInstances::ErrorHandlingConfig,
            CrawlerInstances::UrlPatterns,
            CrawlerInstances::Selectors,
            CrawlerInstances::Tags,
            CrawlerInstances::Metadata,
            CrawlerInstances::Stats,
            CrawlerInstances::Seeds,
            CrawlerInstances::Results,
            CrawlerInstances::Logs,
        ];

        let mut table = Table::create();
        table
            .table(CrawlerInstances::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(CrawlerInstances::Id)
                    .string()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(CrawlerInstances::Name).string().not_null())
            .col(ColumnDef::new(CrawlerInstances::Description).text().not_null())
            .col(ColumnDef::new(CrawlerInstances::CrawlerType).string().not_null())
            .col(ColumnDef::new(CrawlerInstances::Status).string().not_null());

        for column in json_columns {
            table.col(ColumnDef::new(column).json_binary().not_null());
        }

        table
            .col(
                ColumnDef::new(CrawlerInstances::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(
                ColumnDef::new(CrawlerInstances::UpdatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(ColumnDef::new(CrawlerInstances::StartedAt).timestamp_with_time_zone())
            .col(ColumnDef::new(CrawlerInstances::FinishedAt).timestamp_with_time_zone())
            .col(ColumnDef::new(CrawlerInstances::LastRunAt).timestamp_with_time_zone());

        manager.create_table(table.to_owned()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawler_instances_type_status")
                    .table(CrawlerInstances::Table)
                    .col(CrawlerInstances::CrawlerType)
                    .col(CrawlerInstances::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlerInstances::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum CrawlerInstances {
    Table,
    Id,
    Name,
    Description,
    CrawlerType,
    Status,
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
    Tags,
    Metadata,
    Stats,
    Seeds,
    Results,
    Logs,
    CreatedAt,
    UpdatedAt,
    StartedAt,
    FinishedAt,
    LastRunAt,
}
