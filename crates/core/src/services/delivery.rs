//! Webhook delivery queueing.
//!
//! Core services hand webhook jobs to the queue through this trait so they do
//! not depend on the queue implementation. The queue crate provides the
//! Redis-backed implementation.

use async_trait::async_trait;
use dashpilot_common::AppResult;
use serde_json::Value;

/// Trait for queueing webhook deliveries.
#[async_trait]
pub trait WebhookDelivery: Send + Sync {
    /// Queue the first delivery attempt of `payload` to an endpoint.
    ///
    /// # Arguments
    /// * `endpoint_id` - The webhook endpoint to deliver to
    /// * `event_type` - The event type, e.g. `site.down`
    /// * `payload` - The event payload, without a signature
    async fn queue_webhook(
        &self,
        endpoint_id: &str,
        event_type: &str,
        payload: Value,
    ) -> AppResult<()>;
}
