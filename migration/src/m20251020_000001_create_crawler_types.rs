// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 爬虫类型表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlerTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlerTypes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlerTypes::Name).string().not_null())
                    .col(ColumnDef::new(CrawlerTypes::Description).text().not_null())
                    .col(ColumnDef::new(CrawlerTypes::Features).json_binary().not_null())
                    .col(ColumnDef::new(CrawlerTypes::Usage).text().not_null())
                    .col(ColumnDef::new(CrawlerTypes::DocsUrl).string().not_null())
                    .col(ColumnDef::new(CrawlerTypes::Notes).text().not_null())
                    .col(
                        ColumnDef::new(CrawlerTypes::DefaultConfig)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlerTypes::DefaultRequestConfig)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlerTypes::DefaultUrlPatterns)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlerTypes::DefaultSelectors)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlerTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CrawlerTypes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlerTypes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlerTypes {
    Table,
    Id,
    Name,
    Description,
    Features,
    Usage,
    DocsUrl,
    Notes,
    DefaultConfig,
    DefaultRequestConfig,
    DefaultUrlPatterns,
    DefaultSelectors,
    CreatedAt,
    UpdatedAt,
}
