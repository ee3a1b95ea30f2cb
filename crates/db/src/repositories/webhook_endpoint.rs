//! Webhook endpoint repository.

use std::sync::Arc;

use crate::entities::{WebhookEndpoint, webhook_endpoint};
use chrono::{DateTime, Utc};
use dashpilot_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, sea_query::Expr,
};

/// Maximum number of webhook endpoints per user.
pub const MAX_ENDPOINTS_PER_USER: u64 = 10;

/// Webhook endpoint repository for database operations.
#[derive(Clone)]
pub struct WebhookEndpointRepository {
    db: Arc<DatabaseConnection>,
}

impl WebhookEndpointRepository {
    /// Create a new webhook endpoint repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an endpoint by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<webhook_endpoint::Model>> {
        WebhookEndpoint::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an endpoint by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<webhook_endpoint::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Webhook: {id}")))
    }

    /// Find all endpoints for a user.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<webhook_endpoint::Model>> {
        WebhookEndpoint::find()
            .filter(webhook_endpoint::Column::UserId.eq(user_id))
            .order_by_desc(webhook_endpoint::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all active endpoints for a user that subscribe to a specific event.
    pub async fn find_active_by_user_and_event(
        &self,
        user_id: &str,
        event: &str,
    ) -> AppResult<Vec<webhook_endpoint::Model>> {
        // Event subscriptions live in a JSON array, filter them in code.
        let endpoints = WebhookEndpoint::find()
            .filter(webhook_endpoint::Column::UserId.eq(user_id))
            .filter(webhook_endpoint::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(endpoints
            .into_iter()
            .filter(|e| e.subscribes_to(event))
            .collect())
    }

    /// Count endpoints for a user.
    pub async fn count_by_user_id(&self, user_id: &str) -> AppResult<u64> {
        WebhookEndpoint::find()
            .filter(webhook_endpoint::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new endpoint.
    pub async fn create(
        &self,
        model: webhook_endpoint::ActiveModel,
    ) -> AppResult<webhook_endpoint::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an endpoint.
    pub async fn update(
        &self,
        model: webhook_endpoint::ActiveModel,
    ) -> AppResult<webhook_endpoint::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an endpoint owned by `user_id`.
    pub async fn delete(&self, id: &str, user_id: &str) -> AppResult<()> {
        let endpoint = self.get_by_id(id).await?;

        if endpoint.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own webhooks".to_string(),
            ));
        }

        WebhookEndpoint::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Set `last_triggered_at` after a successful delivery.
    pub async fn mark_triggered(&self, id: &str, at: DateTime<Utc>) -> AppResult<()> {
        WebhookEndpoint::update_many()
            .col_expr(webhook_endpoint::Column::LastTriggeredAt, Expr::value(at))
            .filter(webhook_endpoint::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Check if a user has reached the maximum number of endpoints.
    pub async fn user_at_limit(&self, user_id: &str) -> AppResult<bool> {
        let count = self.count_by_user_id(user_id).await?;
        Ok(count >= MAX_ENDPOINTS_PER_USER)
    }
}
