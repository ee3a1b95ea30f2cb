//! Site health check worker.

use apalis::prelude::*;
use dashpilot_core::HealthCheckService;
use tracing::{debug, error};

use crate::jobs::SiteHealthCheckJob;

/// Context for the health check worker.
#[derive(Clone)]
pub struct HealthCheckWorkerContext {
    pub health_service: HealthCheckService,
}

impl HealthCheckWorkerContext {
    /// Create a new health check worker context.
    #[must_use]
    pub const fn new(health_service: HealthCheckService) -> Self {
        Self { health_service }
    }
}

/// Worker function for site health checks.
///
/// # Errors
/// Returns an error if the check could not be recorded.
pub async fn health_check_worker(
    job: SiteHealthCheckJob,
    ctx: Data<HealthCheckWorkerContext>,
) -> Result<(), Error> {
    match ctx.health_service.check_site(&job.site_id).await {
        Ok(Some(check)) => {
            debug!(
                site_id = %job.site_id,
                is_up = check.is_up,
                status_code = check.status_code,
                "Site checked"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            error!(site_id = %job.site_id, error = %e, "Site health check failed");
            let source: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
            Err(Error::Failed(source.into()))
        }
    }
}
