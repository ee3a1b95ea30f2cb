//! Business logic services.

#![allow(missing_docs)]

pub mod delivery;
pub mod dispatcher;
pub mod health_check;
pub mod user;
pub mod webhook;

pub use delivery::WebhookDelivery;
pub use dispatcher::{
    DeliveryError, DeliveryResult, MAX_BODY_CHARS, WebhookDispatcher, build_body, truncate_body,
};
pub use health_check::{HealthCheckService, SiteResponse};
pub use user::UserService;
pub use webhook::{
    CreateWebhookInput, DeliveryResponse, TestWebhookResponse, UpdateWebhookInput,
    WebhookResponse, WebhookService, WebhookWithSecretResponse, event_payload, events,
};
