//! Webhook delivery attempt entity.
//!
//! One row per delivery attempt. Rows are never updated or deleted by the
//! dispatcher.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Delivery attempt model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_delivery")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Endpoint the attempt was made against.
    pub webhook_id: String,

    pub event_type: String,

    /// Body as sent, including the signature when one was added.
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,

    /// HTTP status, 0 if no response was received.
    pub status_code: i32,

    /// Response body, truncated.
    #[sea_orm(column_type = "Text", nullable)]
    pub response_body: Option<String>,

    /// 1-based attempt ordinal.
    pub attempt: i32,

    pub success: bool,

    /// Transport error, truncated.
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::webhook_endpoint::Entity",
        from = "Column::WebhookId",
        to = "super::webhook_endpoint::Column::Id",
        on_delete = "Cascade"
    )]
    WebhookEndpoint,
}

impl Related<super::webhook_endpoint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebhookEndpoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
