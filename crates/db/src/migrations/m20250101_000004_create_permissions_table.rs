//! Create permissions table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Permissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Permissions::KeyId).big_integer().not_null())
                    .col(ColumnDef::new(Permissions::DoorId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Permissions::GrantedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Permissions::GrantedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permissions_key")
                            .from(Permissions::Table, Permissions::KeyId)
                            .to(AccessKeys::Table, AccessKeys::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permissions_door")
                            .from(Permissions::Table, Permissions::DoorId)
                            .to(Doors::Table, Doors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (key_id, door_id) - a permission edge exists at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_permissions_key_door")
                    .table(Permissions::Table)
                    .col(Permissions::KeyId)
                    .col(Permissions::DoorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: door_id (allow-list computation per door)
        manager
            .create_index(
                Index::create()
                    .name("idx_permissions_door_id")
                    .table(Permissions::Table)
                    .col(Permissions::DoorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Permissions {
    Table,
    Id,
    KeyId,
    DoorId,
    GrantedBy,
    GrantedAt,
}

#[derive(Iden)]
enum AccessKeys {
    Table,
    Id,
}

#[derive(Iden)]
enum Doors {
    Table,
    Id,
}
