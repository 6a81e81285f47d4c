//! Create doors table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Doors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Doors::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Doors::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Doors::Location).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Doors::DeviceAddress)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Doors::Status)
                            .string_len(16)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(Doors::LastSeenAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Doors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: device_address (command endpoint resolves address -> door)
        manager
            .create_index(
                Index::create()
                    .name("idx_doors_device_address")
                    .table(Doors::Table)
                    .col(Doors::DeviceAddress)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Doors::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Doors {
    Table,
    Id,
    Name,
    Location,
    DeviceAddress,
    Status,
    LastSeenAt,
    CreatedAt,
}
