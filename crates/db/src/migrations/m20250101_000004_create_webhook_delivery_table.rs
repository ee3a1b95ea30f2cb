//! Create webhook delivery log table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WebhookDelivery::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebhookDelivery::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WebhookDelivery::WebhookId).string().not_null())
                    .col(ColumnDef::new(WebhookDelivery::EventType).string().not_null())
                    .col(ColumnDef::new(WebhookDelivery::Payload).json_binary().not_null())
                    .col(ColumnDef::new(WebhookDelivery::StatusCode).integer().not_null())
                    .col(ColumnDef::new(WebhookDelivery::ResponseBody).text().null())
                    .col(ColumnDef::new(WebhookDelivery::Attempt).integer().not_null())
                    .col(ColumnDef::new(WebhookDelivery::Success).boolean().not_null())
                    .col(ColumnDef::new(WebhookDelivery::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(WebhookDelivery::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_webhook_delivery_endpoint")
                            .from(WebhookDelivery::Table, WebhookDelivery::WebhookId)
                            .to(WebhookEndpoint::Table, WebhookEndpoint::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_webhook_delivery_webhook_id_created_at")
                    .table(WebhookDelivery::Table)
                    .col(WebhookDelivery::WebhookId)
                    .col(WebhookDelivery::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookDelivery::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum WebhookDelivery {
    Table,
    Id,
    WebhookId,
    EventType,
    Payload,
    StatusCode,
    ResponseBody,
    Attempt,
    Success,
    ErrorMessage,
    CreatedAt,
}

#[derive(Iden)]
pub enum WebhookEndpoint {
    Table,
    Id,
}
