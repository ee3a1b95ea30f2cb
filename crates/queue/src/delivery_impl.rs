//! Queue-backed webhook delivery implementation.
//!
//! Implements the core `WebhookDelivery` trait by pushing the first attempt
//! of each delivery onto the webhook job queue.

use std::sync::Arc;

use apalis_redis::RedisStorage;
use async_trait::async_trait;
use dashpilot_common::AppResult;
use dashpilot_core::WebhookDelivery;
use serde_json::Value;

use crate::jobs::WebhookDeliveryJob;
use crate::storage::{ApalisQueue, JobQueue};

/// Redis-backed webhook delivery service.
#[derive(Clone)]
pub struct RedisWebhookDelivery {
    queue: Arc<dyn JobQueue<WebhookDeliveryJob>>,
}

impl RedisWebhookDelivery {
    /// Create a delivery service pushing to a Redis storage.
    #[must_use]
    pub fn new(storage: RedisStorage<WebhookDeliveryJob>) -> Self {
        Self::from_queue(Arc::new(ApalisQueue::new(storage)))
    }

    /// Create a delivery service pushing to any queue.
    #[must_use]
    pub fn from_queue(queue: Arc<dyn JobQueue<WebhookDeliveryJob>>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl WebhookDelivery for RedisWebhookDelivery {
    async fn queue_webhook(
        &self,
        endpoint_id: &str,
        event_type: &str,
        payload: Value,
    ) -> AppResult<()> {
        let job = WebhookDeliveryJob::new(endpoint_id.to_string(), event_type.to_string(), payload);
        self.queue.push(job).await?;

        tracing::debug!(
            endpoint_id = %endpoint_id,
            event_type = %event_type,
            "Queued webhook delivery"
        );
        Ok(())
    }
}
