//! Webhook endpoint entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Webhook endpoint model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_endpoint")]
pub struct Model {
    /// Unique identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// User who owns this endpoint.
    pub user_id: String,

    /// Target URL to send events to.
    #[sea_orm(column_type = "Text")]
    pub url: String,

    /// Shared secret for signing payloads. Unsigned when absent.
    #[sea_orm(nullable)]
    pub secret: Option<String>,

    /// Is this endpoint active?
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Events this endpoint is subscribed to (JSON array).
    #[sea_orm(column_type = "JsonBinary")]
    pub events: Json,

    /// Last successful delivery.
    #[sea_orm(nullable)]
    pub last_triggered_at: Option<DateTimeWithTimeZone>,

    /// When this endpoint was created.
    pub created_at: DateTimeWithTimeZone,

    /// When this endpoint was last updated.
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Event types this endpoint subscribes to.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        serde_json::from_value(self.events.clone()).unwrap_or_default()
    }

    /// Whether this endpoint subscribes to `event`.
    #[must_use]
    pub fn subscribes_to(&self, event: &str) -> bool {
        self.event_types().iter().any(|e| e == event)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::webhook_delivery::Entity")]
    WebhookDelivery,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::webhook_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WebhookDelivery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
