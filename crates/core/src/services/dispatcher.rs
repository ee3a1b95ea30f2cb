//! Webhook dispatcher.
//!
//! Performs exactly one delivery attempt per call: sign, POST, record the
//! attempt, and report the outcome. Retrying is the caller's job.

use chrono::Utc;
use dashpilot_common::{AppError, IdGenerator, config::WebhookConfig, signature};
use dashpilot_db::entities::{webhook_delivery, webhook_endpoint};
use dashpilot_db::repositories::{WebhookDeliveryRepository, WebhookEndpointRepository};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use sea_orm::Set;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of characters kept from a response body or error message.
pub const MAX_BODY_CHARS: usize = 1000;

/// Name of the body field carrying the payload signature.
pub const SIGNATURE_FIELD: &str = "signature";

/// A successful delivery attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub delivery_id: String,
    pub status_code: u16,
    pub response_body: String,
}

/// Why a delivery attempt did not succeed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint answered with a non-2xx status, or no response was
    /// received (`status_code` 0). The attempt has been recorded.
    #[error("Webhook delivery failed with status {status_code}: {body}")]
    Failed { status_code: u16, body: String },

    /// Infrastructure error; the attempt may not have been recorded.
    #[error(transparent)]
    App(#[from] AppError),
}

/// Outcome of the HTTP exchange.
struct SendOutcome {
    status_code: u16,
    body: Option<String>,
    error: Option<String>,
}

impl SendOutcome {
    fn transport_error(e: &reqwest::Error) -> Self {
        Self {
            status_code: 0,
            body: None,
            error: Some(if e.is_timeout() {
                format!("Request timed out: {e}")
            } else {
                format!("Request failed: {e}")
            }),
        }
    }

    fn success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Delivers signed webhook payloads and records every attempt.
#[derive(Clone)]
pub struct WebhookDispatcher {
    delivery_repo: WebhookDeliveryRepository,
    endpoint_repo: WebhookEndpointRepository,
    http_client: Arc<reqwest::Client>,
    user_agent: String,
    id_gen: IdGenerator,
}

impl WebhookDispatcher {
    /// Create a new dispatcher.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(
        delivery_repo: WebhookDeliveryRepository,
        endpoint_repo: WebhookEndpointRepository,
        config: &WebhookConfig,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            delivery_repo,
            endpoint_repo,
            http_client: Arc::new(http_client),
            user_agent: config.user_agent(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Deliver `payload` to `endpoint` as attempt number `attempt`.
    ///
    /// Exactly one `webhook_delivery` row is written per call once the
    /// request has been built. `last_triggered_at` is only touched on a 2xx.
    pub async fn deliver(
        &self,
        endpoint: &webhook_endpoint::Model,
        event_type: &str,
        payload: Value,
        attempt: u32,
    ) -> Result<DeliveryResult, DeliveryError> {
        if endpoint.url.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Webhook {} has no URL",
                endpoint.id
            ))
            .into());
        }

        let body = build_body(payload, endpoint.secret.as_deref())?;
        let bytes = serde_json::to_vec(&body)
            .map_err(|e| AppError::Internal(format!("Failed to serialize payload: {e}")))?;

        let outcome = self.send(&endpoint.url, bytes).await;
        let success = outcome.success();
        let recorded_body = outcome
            .body
            .as_deref()
            .or(outcome.error.as_deref())
            .map(truncate_body)
            .unwrap_or_default();

        let record = attempt_record(
            self.id_gen.generate(),
            &endpoint.id,
            event_type,
            Value::Object(body),
            attempt,
            &outcome,
        );
        let delivery = self.delivery_repo.create(record).await?;

        if success {
            self.endpoint_repo
                .mark_triggered(&endpoint.id, Utc::now())
                .await?;
            debug!(
                webhook_id = %endpoint.id,
                event_type = %event_type,
                attempt,
                status_code = outcome.status_code,
                "Webhook delivered"
            );
            return Ok(DeliveryResult {
                delivery_id: delivery.id,
                status_code: outcome.status_code,
                response_body: recorded_body,
            });
        }

        warn!(
            webhook_id = %endpoint.id,
            event_type = %event_type,
            attempt,
            status_code = outcome.status_code,
            "Webhook delivery attempt failed"
        );
        Err(DeliveryError::Failed {
            status_code: outcome.status_code,
            body: recorded_body,
        })
    }

    async fn send(&self, url: &str, body: Vec<u8>) -> SendOutcome {
        let result = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .body(body)
            .send()
            .await;

        let mut response = match result {
            Ok(response) => response,
            Err(e) => return SendOutcome::transport_error(&e),
        };

        let status_code = response.status().as_u16();
        // The client timeout also covers the body; a stalled body is no response.
        match read_body_prefix(&mut response).await {
            Ok(body) => SendOutcome {
                status_code,
                body: Some(body),
                error: None,
            },
            Err(e) => SendOutcome::transport_error(&e),
        }
    }
}

/// Read only as much of the body as [`truncate_body`] keeps.
async fn read_body_prefix(response: &mut reqwest::Response) -> Result<String, reqwest::Error> {
    // UTF-8 needs at most 4 bytes per char; one extra char covers a split tail.
    let limit = (MAX_BODY_CHARS + 1) * 4;
    let mut buf = Vec::new();
    while buf.len() < limit {
        match response.chunk().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => break,
        }
    }
    Ok(truncate_body(&String::from_utf8_lossy(&buf)))
}

/// Build the wire body, adding a signature only when a secret is set.
///
/// Non-object payloads are wrapped as `{"data": payload}`. A `signature`
/// field supplied by the caller is always dropped.
pub fn build_body(payload: Value, secret: Option<&str>) -> Result<Map<String, Value>, AppError> {
    let mut body = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    body.remove(SIGNATURE_FIELD);

    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        let signature = signature::sign_payload(&body, secret)?;
        body.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
    }

    Ok(body)
}

/// Keep the first [`MAX_BODY_CHARS`] characters of `s`.
#[must_use]
pub fn truncate_body(s: &str) -> String {
    s.chars().take(MAX_BODY_CHARS).collect()
}

fn attempt_record(
    id: String,
    webhook_id: &str,
    event_type: &str,
    payload: Value,
    attempt: u32,
    outcome: &SendOutcome,
) -> webhook_delivery::ActiveModel {
    webhook_delivery::ActiveModel {
        id: Set(id),
        webhook_id: Set(webhook_id.to_string()),
        event_type: Set(event_type.to_string()),
        payload: Set(payload),
        status_code: Set(i32::from(outcome.status_code)),
        response_body: Set(outcome.body.as_deref().map(truncate_body)),
        attempt: Set(i32::try_from(attempt).unwrap_or(i32::MAX)),
        success: Set(outcome.success()),
        error_message: Set(outcome.error.as_deref().map(truncate_body)),
        created_at: Set(Utc::now().into()),
    }
}
