//! Site repository.

use std::sync::Arc;

use crate::entities::{Site, site};
use chrono::{DateTime, Utc};
use dashpilot_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, sea_query::Expr,
};

/// Site repository for database operations.
#[derive(Clone)]
pub struct SiteRepository {
    db: Arc<DatabaseConnection>,
}

impl SiteRepository {
    /// Create a new site repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a site by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<site::Model>> {
        Site::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a site by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<site::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Site: {id}")))
    }

    /// All sites that are not archived.
    pub async fn find_unarchived(&self) -> AppResult<Vec<site::Model>> {
        Site::find()
            .filter(site::Column::IsArchived.eq(false))
            .order_by_asc(site::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record the outcome of a health check on the site row.
    pub async fn update_status(
        &self,
        id: &str,
        status: site::SiteStatus,
        checked_at: DateTime<Utc>,
    ) -> AppResult<()> {
        Site::update_many()
            .col_expr(site::Column::Status, Expr::value(status))
            .col_expr(site::Column::LastCheckedAt, Expr::value(checked_at))
            .filter(site::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
