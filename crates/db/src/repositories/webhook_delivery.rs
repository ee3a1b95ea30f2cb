//! Webhook delivery log repository.

use std::sync::Arc;

use crate::entities::{WebhookDelivery, webhook_delivery};
use dashpilot_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Repository for delivery attempt records. Insert-only.
#[derive(Clone)]
pub struct WebhookDeliveryRepository {
    db: Arc<DatabaseConnection>,
}

impl WebhookDeliveryRepository {
    /// Create a new delivery repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a delivery attempt.
    pub async fn create(
        &self,
        model: webhook_delivery::ActiveModel,
    ) -> AppResult<webhook_delivery::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent attempts for an endpoint, newest first.
    pub async fn find_by_webhook_id(
        &self,
        webhook_id: &str,
        limit: u64,
    ) -> AppResult<Vec<webhook_delivery::Model>> {
        WebhookDelivery::find()
            .filter(webhook_delivery::Column::WebhookId.eq(webhook_id))
            .order_by_desc(webhook_delivery::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
