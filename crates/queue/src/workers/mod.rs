//! Job workers.

mod health_check;
mod webhook;

pub use health_check::{HealthCheckWorkerContext, health_check_worker};
pub use webhook::{
    WebhookJobError, WebhookJobOutcome, WebhookWorkerContext, process_webhook_job, webhook_worker,
};
