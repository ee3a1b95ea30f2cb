//! Job definitions.

#![allow(missing_docs)]

mod health_check;
mod webhook;

pub use health_check::SiteHealthCheckJob;
pub use webhook::WebhookDeliveryJob;
