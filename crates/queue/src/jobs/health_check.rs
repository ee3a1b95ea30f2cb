//! Site health check job.

use serde::{Deserialize, Serialize};

/// Job to check one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteHealthCheckJob {
    /// The site to check.
    pub site_id: String,
}

impl SiteHealthCheckJob {
    /// Create a new health check job.
    #[must_use]
    pub const fn new(site_id: String) -> Self {
        Self { site_id }
    }
}
