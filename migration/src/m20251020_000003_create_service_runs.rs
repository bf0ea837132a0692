// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 服务进程运行记录表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceRuns::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServiceRuns::ServiceId).string().not_null())
                    .col(ColumnDef::new(ServiceRuns::Pid).big_integer().not_null())
                    .col(ColumnDef::new(ServiceRuns::Command).string().not_null())
                    .col(ColumnDef::new(ServiceRuns::Args).json_binary().not_null())
                    .col(ColumnDef::new(ServiceRuns::Status).string().not_null())
                    .col(
                        ColumnDef::new(ServiceRuns::StartTime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ServiceRuns::StopTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(ServiceRuns::ExitCode).integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_runs_service_status")
                    .table(ServiceRuns::Table)
                    .col(ServiceRuns::ServiceId)
                    .col(ServiceRuns::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceRuns {
    Table,
    Id,
    ServiceId,
    Pid,
    Command,
    Args,
    Status,
    StartTime,
    StopTime,
    ExitCode,
}
