//! Webhook endpoint management and event fan-out.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use dashpilot_common::{AppError, AppResult, IdGenerator, UrlGuard};
use dashpilot_db::entities::{webhook_delivery, webhook_endpoint};
use dashpilot_db::repositories::{WebhookDeliveryRepository, WebhookEndpointRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use validator::Validate;

use super::delivery::WebhookDelivery;
use super::dispatcher::{DeliveryError, WebhookDispatcher};

/// Webhook events.
pub mod events {
    pub const SITE_DOWN: &str = "site.down";
    pub const SITE_UP: &str = "site.up";
    pub const ALERT_CREATED: &str = "alert.created";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const REPORT_GENERATED: &str = "report.generated";
    /// Sent only by the test action; endpoints cannot subscribe to it.
    pub const WEBHOOK_TEST: &str = "webhook.test";

    /// Get all events an endpoint can subscribe to.
    #[must_use]
    pub fn all() -> Vec<&'static str> {
        vec![
            SITE_DOWN,
            SITE_UP,
            ALERT_CREATED,
            TASK_COMPLETED,
            REPORT_GENERATED,
        ]
    }

    /// Check if an event is valid.
    #[must_use]
    pub fn is_valid(event: &str) -> bool {
        all().contains(&event)
    }
}

/// Default number of delivery log rows returned.
const DEFAULT_DELIVERY_LIMIT: u64 = 50;

/// Maximum number of delivery log rows returned.
const MAX_DELIVERY_LIMIT: u64 = 100;

/// Input for creating a webhook.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookInput {
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    /// Shared secret for signing. A random one is generated when
    /// `generate_secret` is set and no secret is given.
    #[validate(length(min = 1, max = 256))]
    pub secret: Option<String>,
    #[serde(default)]
    pub generate_secret: bool,
    #[validate(length(min = 1))]
    pub events: Vec<String>,
}

/// Input for updating a webhook.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookInput {
    #[validate(length(min = 1, max = 2048))]
    pub url: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub secret: Option<String>,
    /// Remove the secret so deliveries are sent unsigned.
    #[serde(default)]
    pub remove_secret: bool,
    #[validate(length(min = 1))]
    pub events: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Response for a webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub has_secret: bool,
    pub last_triggered_at: Option<String>,
    pub created_at: String,
}

impl From<webhook_endpoint::Model> for WebhookResponse {
    fn from(w: webhook_endpoint::Model) -> Self {
        Self {
            events: w.event_types(),
            has_secret: w.secret.as_deref().is_some_and(|s| !s.is_empty()),
            id: w.id,
            url: w.url,
            is_active: w.is_active,
            last_triggered_at: w.last_triggered_at.map(|t| t.to_rfc3339()),
            created_at: w.created_at.to_rfc3339(),
        }
    }
}

/// Response for webhook creation and secret rotation (includes the secret).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookWithSecretResponse {
    #[serde(flatten)]
    pub webhook: WebhookResponse,
    pub secret: Option<String>,
}

/// One row of a webhook's delivery log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub id: String,
    pub event_type: String,
    pub payload: Value,
    pub status_code: i32,
    pub response_body: Option<String>,
    pub attempt: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl From<webhook_delivery::Model> for DeliveryResponse {
    fn from(d: webhook_delivery::Model) -> Self {
        Self {
            id: d.id,
            event_type: d.event_type,
            payload: d.payload,
            status_code: d.status_code,
            response_body: d.response_body,
            attempt: d.attempt,
            success: d.success,
            error_message: d.error_message,
            created_at: d.created_at.to_rfc3339(),
        }
    }
}

/// Result of a test delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestWebhookResponse {
    pub success: bool,
    pub status_code: u16,
}

/// Build the payload sent for `event`.
#[must_use]
pub fn event_payload(event: &str, data: Value) -> Value {
    json!({
        "event": event,
        "timestamp": Utc::now().to_rfc3339(),
        "data": data,
    })
}

/// Service for managing webhooks.
#[derive(Clone)]
pub struct WebhookService {
    endpoint_repo: WebhookEndpointRepository,
    delivery_repo: WebhookDeliveryRepository,
    dispatcher: WebhookDispatcher,
    url_guard: UrlGuard,
    delivery: Option<Arc<dyn WebhookDelivery>>,
    id_gen: IdGenerator,
}

impl WebhookService {
    /// Create a new webhook service.
    #[must_use]
    pub fn new(
        endpoint_repo: WebhookEndpointRepository,
        delivery_repo: WebhookDeliveryRepository,
        dispatcher: WebhookDispatcher,
        url_guard: UrlGuard,
    ) -> Self {
        Self {
            endpoint_repo,
            delivery_repo,
            dispatcher,
            url_guard,
            delivery: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the queue used by [`Self::trigger`].
    #[must_use]
    pub fn with_delivery(mut self, delivery: Arc<dyn WebhookDelivery>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    // ==================== Management ====================

    /// Create a new webhook.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateWebhookInput,
    ) -> AppResult<WebhookWithSecretResponse> {
        input.validate()?;
        validate_events(&input.events)?;
        self.url_guard.validate(&input.url).await?;

        if self.endpoint_repo.user_at_limit(user_id).await? {
            return Err(AppError::Validation(
                "Maximum number of webhooks reached".to_string(),
            ));
        }

        let secret = match input.secret {
            Some(secret) => Some(secret),
            None if input.generate_secret => Some(generate_secret()),
            None => None,
        };

        let model = webhook_endpoint::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            url: Set(input.url),
            secret: Set(secret.clone()),
            is_active: Set(true),
            events: Set(json!(input.events)),
            last_triggered_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let webhook = self.endpoint_repo.create(model).await?;

        Ok(WebhookWithSecretResponse {
            webhook: webhook.into(),
            secret,
        })
    }

    /// Update a webhook.
    pub async fn update(
        &self,
        user_id: &str,
        webhook_id: &str,
        input: UpdateWebhookInput,
    ) -> AppResult<WebhookResponse> {
        input.validate()?;
        let webhook = self.owned(user_id, webhook_id).await?;

        let mut active: webhook_endpoint::ActiveModel = webhook.into();

        if let Some(url) = input.url {
            self.url_guard.validate(&url).await?;
            active.url = Set(url);
        }

        if let Some(requested_events) = input.events {
            validate_events(&requested_events)?;
            active.events = Set(json!(requested_events));
        }

        if input.remove_secret {
            active.secret = Set(None);
        } else if let Some(secret) = input.secret {
            active.secret = Set(Some(secret));
        }

        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.endpoint_repo.update(active).await?;
        Ok(updated.into())
    }

    /// Delete a webhook.
    pub async fn delete(&self, user_id: &str, webhook_id: &str) -> AppResult<()> {
        self.endpoint_repo.delete(webhook_id, user_id).await
    }

    /// List webhooks for a user.
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<WebhookResponse>> {
        let webhooks = self.endpoint_repo.find_by_user_id(user_id).await?;
        Ok(webhooks.into_iter().map(Into::into).collect())
    }

    /// Get a webhook by ID.
    pub async fn get(&self, user_id: &str, webhook_id: &str) -> AppResult<WebhookResponse> {
        Ok(self.owned(user_id, webhook_id).await?.into())
    }

    /// Replace the secret with a freshly generated one.
    pub async fn regenerate_secret(
        &self,
        user_id: &str,
        webhook_id: &str,
    ) -> AppResult<WebhookWithSecretResponse> {
        let webhook = self.owned(user_id, webhook_id).await?;

        let new_secret = generate_secret();

        let mut active: webhook_endpoint::ActiveModel = webhook.into();
        active.secret = Set(Some(new_secret.clone()));
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.endpoint_repo.update(active).await?;

        Ok(WebhookWithSecretResponse {
            webhook: updated.into(),
            secret: Some(new_secret),
        })
    }

    /// Recent delivery attempts for a webhook, newest first.
    pub async fn deliveries(
        &self,
        user_id: &str,
        webhook_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<DeliveryResponse>> {
        let webhook = self.owned(user_id, webhook_id).await?;
        let limit = limit
            .unwrap_or(DEFAULT_DELIVERY_LIMIT)
            .clamp(1, MAX_DELIVERY_LIMIT);

        let rows = self
            .delivery_repo
            .find_by_webhook_id(&webhook.id, limit)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ==================== Delivery ====================

    /// Queue `event` for every active endpoint of `user_id` subscribed to it.
    ///
    /// Returns the number of deliveries queued.
    pub async fn trigger(&self, user_id: &str, event: &str, data: Value) -> AppResult<usize> {
        let Some(delivery) = &self.delivery else {
            tracing::debug!(event = %event, "No webhook queue configured, skipping trigger");
            return Ok(0);
        };

        let webhooks = self
            .endpoint_repo
            .find_active_by_user_and_event(user_id, event)
            .await?;

        let payload = event_payload(event, data);
        for webhook in &webhooks {
            delivery
                .queue_webhook(&webhook.id, event, payload.clone())
                .await?;
        }

        tracing::debug!(
            user_id = %user_id,
            event = %event,
            count = webhooks.len(),
            "Queued webhook deliveries"
        );

        Ok(webhooks.len())
    }

    /// Send a `webhook.test` delivery right away and report the outcome.
    pub async fn test(&self, user_id: &str, webhook_id: &str) -> AppResult<TestWebhookResponse> {
        let webhook = self.owned(user_id, webhook_id).await?;

        let payload = event_payload(
            events::WEBHOOK_TEST,
            json!({ "message": "This is a test webhook delivery" }),
        );

        match self
            .dispatcher
            .deliver(&webhook, events::WEBHOOK_TEST, payload, 1)
            .await
        {
            Ok(result) => Ok(TestWebhookResponse {
                success: true,
                status_code: result.status_code,
            }),
            Err(DeliveryError::Failed { status_code, .. }) => Ok(TestWebhookResponse {
                success: false,
                status_code,
            }),
            Err(DeliveryError::App(e)) => Err(e),
        }
    }

    // ==================== Helper Methods ====================

    async fn owned(&self, user_id: &str, webhook_id: &str) -> AppResult<webhook_endpoint::Model> {
        let webhook = self.endpoint_repo.get_by_id(webhook_id).await?;
        if webhook.user_id != user_id {
            return Err(AppError::NotFound(format!("Webhook: {webhook_id}")));
        }
        Ok(webhook)
    }
}

fn validate_events(requested: &[String]) -> AppResult<()> {
    if requested.is_empty() {
        return Err(AppError::Validation(
            "At least one event must be specified".to_string(),
        ));
    }
    for event in requested {
        if !events::is_valid(event) {
            return Err(AppError::Validation(format!("Invalid event: {event}")));
        }
    }
    Ok(())
}

fn generate_secret() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
