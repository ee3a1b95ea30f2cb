//! Webhook delivery job.

use serde::{Deserialize, Serialize};

/// One delivery attempt of an event to a webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDeliveryJob {
    /// Target endpoint ID.
    pub endpoint_id: String,

    /// Event type, e.g. `site.down`.
    pub event_type: String,

    /// Event payload, unsigned.
    pub payload: serde_json::Value,

    /// 1-based attempt number.
    pub attempt: u32,
}

impl WebhookDeliveryJob {
    /// Create the first attempt of a delivery.
    #[must_use]
    pub const fn new(endpoint_id: String, event_type: String, payload: serde_json::Value) -> Self {
        Self {
            endpoint_id,
            event_type,
            payload,
            attempt: 1,
        }
    }

    /// The same delivery, one attempt later.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}
