//! Create site health check table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteHealthCheck::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteHealthCheck::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SiteHealthCheck::SiteId).string().not_null())
                    .col(ColumnDef::new(SiteHealthCheck::StatusCode).integer().not_null())
                    .col(
                        ColumnDef::new(SiteHealthCheck::ResponseTimeMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SiteHealthCheck::IsUp).boolean().not_null())
                    .col(ColumnDef::new(SiteHealthCheck::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(SiteHealthCheck::CheckedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_site_health_check_site")
                            .from(SiteHealthCheck::Table, SiteHealthCheck::SiteId)
                            .to(Site::Table, Site::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_site_health_check_site_id_checked_at")
                    .table(SiteHealthCheck::Table)
                    .col(SiteHealthCheck::SiteId)
                    .col(SiteHealthCheck::CheckedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SiteHealthCheck::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SiteHealthCheck {
    Table,
    Id,
    SiteId,
    StatusCode,
    ResponseTimeMs,
    IsUp,
    ErrorMessage,
    CheckedAt,
}

#[derive(Iden)]
pub enum Site {
    Table,
    Id,
}
