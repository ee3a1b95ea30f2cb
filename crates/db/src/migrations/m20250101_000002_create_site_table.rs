//! Create site table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Site::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Site::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Site::UserId).string().not_null())
                    .col(ColumnDef::new(Site::Name).string().not_null())
                    .col(ColumnDef::new(Site::Url).text().not_null())
                    .col(ColumnDef::new(Site::Platform).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Site::IsArchived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Site::Status)
                            .string_len(16)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(Site::LastCheckedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Site::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Site::UpdatedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_site_user")
                            .from(Site::Table, Site::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_site_user_id")
                    .table(Site::Table)
                    .col(Site::UserId)
                    .to_owned(),
            )
            .await?;

        // The scheduler scans non-archived sites every few minutes.
        manager
            .create_index(
                Index::create()
                    .name("idx_site_is_archived")
                    .table(Site::Table)
                    .col(Site::IsArchived)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Site::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Site {
    Table,
    Id,
    UserId,
    Name,
    Url,
    Platform,
    IsArchived,
    Status,
    LastCheckedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum User {
    Table,
    Id,
}
