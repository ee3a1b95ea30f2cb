//! Site health checks.

use chrono::Utc;
use dashpilot_common::{AppResult, IdGenerator, config::HealthCheckConfig};
use dashpilot_db::entities::{site, site_health_check};
use dashpilot_db::repositories::{SiteHealthCheckRepository, SiteRepository};
use reqwest::header::USER_AGENT;
use sea_orm::Set;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::dispatcher::truncate_body;
use super::webhook::{WebhookService, events};

/// Result of requesting a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteResponse {
    pub status_code: u16,
    pub response_time_ms: i64,
    pub error: Option<String>,
}

impl SiteResponse {
    /// A site is up when it answered with a status below 400.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status_code != 0 && self.status_code < 400
    }
}

/// Service that checks managed sites and records their availability.
#[derive(Clone)]
pub struct HealthCheckService {
    site_repo: SiteRepository,
    check_repo: SiteHealthCheckRepository,
    webhook_service: WebhookService,
    http_client: reqwest::Client,
    user_agent: String,
    id_gen: IdGenerator,
}

impl HealthCheckService {
    /// Create a new health check service.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(
        site_repo: SiteRepository,
        check_repo: SiteHealthCheckRepository,
        webhook_service: WebhookService,
        config: &HealthCheckConfig,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            site_repo,
            check_repo,
            webhook_service,
            http_client,
            user_agent: format!("DashPilot-HealthCheck/{}", env!("CARGO_PKG_VERSION")),
            id_gen: IdGenerator::new(),
        }
    }

    /// Sites the periodic fan-out should check.
    pub async fn sites_to_check(&self) -> AppResult<Vec<site::Model>> {
        self.site_repo.find_unarchived().await
    }

    /// Check one site, record the result and notify on an up/down change.
    ///
    /// Returns `None` when the site has been archived since it was queued.
    pub async fn check_site(&self, site_id: &str) -> AppResult<Option<site_health_check::Model>> {
        let site = self.site_repo.get_by_id(site_id).await?;
        if site.is_archived {
            debug!(site_id = %site_id, "Skipping archived site");
            return Ok(None);
        }

        let response = self.request_site(&site.url).await;
        let is_up = response.is_up();
        let now = Utc::now();

        let check = self
            .check_repo
            .create(site_health_check::ActiveModel {
                id: Set(self.id_gen.generate()),
                site_id: Set(site.id.clone()),
                status_code: Set(i32::from(response.status_code)),
                response_time_ms: Set(response.response_time_ms),
                is_up: Set(is_up),
                error_message: Set(response.error.as_deref().map(truncate_body)),
                checked_at: Set(now.into()),
            })
            .await?;

        let new_status = if is_up {
            site::SiteStatus::Up
        } else {
            site::SiteStatus::Down
        };
        self.site_repo.update_status(&site.id, new_status, now).await?;

        if let Some(event) = transition_event(site.status, new_status) {
            info!(
                site_id = %site.id,
                event = %event,
                status_code = response.status_code,
                "Site status changed"
            );
            let data = json!({
                "siteId": site.id,
                "siteName": site.name,
                "url": site.url,
                "statusCode": response.status_code,
                "responseTimeMs": response.response_time_ms,
                "error": response.error,
            });
            self.webhook_service
                .trigger(&site.user_id, event, data)
                .await?;
        }

        Ok(Some(check))
    }

    async fn request_site(&self, url: &str) -> SiteResponse {
        let started = Instant::now();
        let result = self
            .http_client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await;
        let response_time_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        match result {
            Ok(response) => SiteResponse {
                status_code: response.status().as_u16(),
                response_time_ms,
                error: None,
            },
            Err(e) => SiteResponse {
                status_code: 0,
                response_time_ms,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Webhook event for a status change, if any.
///
/// A first check that finds the site down counts as going down; a first
/// check that finds it up does not notify.
#[must_use]
pub const fn transition_event(
    previous: site::SiteStatus,
    current: site::SiteStatus,
) -> Option<&'static str> {
    match (previous, current) {
        (site::SiteStatus::Up | site::SiteStatus::Unknown, site::SiteStatus::Down) => {
            Some(events::SITE_DOWN)
        }
        (site::SiteStatus::Down, site::SiteStatus::Up) => Some(events::SITE_UP),
        _ => None,
    }
}
