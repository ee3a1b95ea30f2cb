//! Site health check repository.

use std::sync::Arc;

use crate::entities::site_health_check;
use dashpilot_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection};

/// Repository for site health check results.
#[derive(Clone)]
pub struct SiteHealthCheckRepository {
    db: Arc<DatabaseConnection>,
}

impl SiteHealthCheckRepository {
    /// Create a new health check repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a health check result.
    pub async fn create(
        &self,
        model: site_health_check::ActiveModel,
    ) -> AppResult<site_health_check::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
