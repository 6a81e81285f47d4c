//! Create access_keys table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessKeys::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessKeys::KeyUid).string_len(64).not_null())
                    .col(
                        ColumnDef::new(AccessKeys::Label)
                            .string_len(128)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(AccessKeys::UserId).big_integer())
                    .col(
                        ColumnDef::new(AccessKeys::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(AccessKeys::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_keys_user")
                            .from(AccessKeys::Table, AccessKeys::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: key_uid is the physical credential identifier and is
        // never re-used while a record exists, including inactive ones
        manager
            .create_index(
                Index::create()
                    .name("idx_access_keys_key_uid")
                    .table(AccessKeys::Table)
                    .col(AccessKeys::KeyUid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for listing a user's keys)
        manager
            .create_index(
                Index::create()
                    .name("idx_access_keys_user_id")
                    .table(AccessKeys::Table)
                    .col(AccessKeys::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessKeys::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccessKeys {
    Table,
    Id,
    KeyUid,
    Label,
    UserId,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
