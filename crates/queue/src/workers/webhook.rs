//! Webhook delivery worker.

use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use dashpilot_common::AppError;
use dashpilot_core::{DeliveryError, WebhookDispatcher};
use dashpilot_db::repositories::WebhookEndpointRepository;
use tracing::{error, warn};

use crate::jobs::WebhookDeliveryJob;
use crate::retry::{DeadLetterEntry, RetryDecision, RetryPolicy};
use crate::storage::JobQueue;

/// Context for the webhook worker.
#[derive(Clone)]
pub struct WebhookWorkerContext {
    pub endpoint_repo: WebhookEndpointRepository,
    pub dispatcher: WebhookDispatcher,
    /// Queue failed attempts are re-enqueued on.
    pub retry_queue: Arc<dyn JobQueue<WebhookDeliveryJob>>,
    pub policy: RetryPolicy,
}

impl WebhookWorkerContext {
    /// Create a new webhook worker context with the default retry policy.
    #[must_use]
    pub fn new(
        endpoint_repo: WebhookEndpointRepository,
        dispatcher: WebhookDispatcher,
        retry_queue: Arc<dyn JobQueue<WebhookDeliveryJob>>,
    ) -> Self {
        Self {
            endpoint_repo,
            dispatcher,
            retry_queue,
            policy: RetryPolicy::default(),
        }
    }
}

/// What happened to a webhook job.
#[derive(Debug)]
pub enum WebhookJobOutcome {
    /// The endpoint answered 2xx.
    Delivered,
    /// The attempt failed; the next one is queued.
    RetryScheduled { attempt: u32, delay: Duration },
    /// The last attempt failed; nothing more is queued.
    Exhausted(DeadLetterEntry<WebhookDeliveryJob>),
    /// The endpoint was deleted or deactivated.
    Dropped,
}

/// Why a webhook job could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum WebhookJobError {
    /// The endpoint could not be loaded. Nothing was sent.
    #[error("Failed to load webhook endpoint: {0}")]
    Lookup(#[source] AppError),

    /// The attempt was made but its bookkeeping failed, so running the job
    /// again would repeat the POST.
    #[error("Webhook attempt could not be completed: {0}")]
    Attempt(#[source] AppError),
}

impl WebhookJobError {
    /// Whether apalis may run the job again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }
}

/// Worker function for webhook deliveries.
///
/// Failed attempts are re-enqueued here with the policy's delay, so the
/// worker reports success to apalis for them. Errors after the dispatcher has
/// been called abort the job; only endpoint lookup errors are retried by
/// apalis.
pub async fn webhook_worker(
    job: WebhookDeliveryJob,
    ctx: Data<WebhookWorkerContext>,
) -> Result<(), Error> {
    let endpoint_id = job.endpoint_id.clone();
    let attempt = job.attempt;
    match process_webhook_job(job, &ctx).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let retryable = e.is_retryable();
            if retryable {
                warn!(endpoint_id = %endpoint_id, attempt, error = %e, "Webhook job failed, will retry");
            } else {
                error!(endpoint_id = %endpoint_id, attempt, error = %e, "Webhook job aborted");
            }
            let source: Box<dyn std::error::Error + Send + Sync> = Box::new(e);
            if retryable {
                Err(Error::Failed(source.into()))
            } else {
                Err(Error::Abort(source.into()))
            }
        }
    }
}

/// Run one attempt of `job` and apply the retry policy to a failure.
pub async fn process_webhook_job(
    job: WebhookDeliveryJob,
    ctx: &WebhookWorkerContext,
) -> Result<WebhookJobOutcome, WebhookJobError> {
    let endpoint = ctx
        .endpoint_repo
        .find_by_id(&job.endpoint_id)
        .await
        .map_err(WebhookJobError::Lookup)?;
    let Some(endpoint) = endpoint else {
        warn!(endpoint_id = %job.endpoint_id, "Webhook endpoint gone, dropping delivery");
        return Ok(WebhookJobOutcome::Dropped);
    };
    if !endpoint.is_active {
        warn!(endpoint_id = %job.endpoint_id, "Webhook endpoint inactive, dropping delivery");
        return Ok(WebhookJobOutcome::Dropped);
    }

    let result = ctx
        .dispatcher
        .deliver(&endpoint, &job.event_type, job.payload.clone(), job.attempt)
        .await;

    let (status_code, body) = match result {
        Ok(_) => return Ok(WebhookJobOutcome::Delivered),
        Err(DeliveryError::Failed { status_code, body }) => (status_code, body),
        Err(DeliveryError::App(e)) => return Err(WebhookJobError::Attempt(e)),
    };

    match ctx.policy.after_failure(&job) {
        RetryDecision::Retry { job: next, delay } => {
            let attempt = next.attempt;
            ctx.retry_queue
                .schedule(next, delay)
                .await
                .map_err(WebhookJobError::Attempt)?;
            warn!(
                endpoint_id = %job.endpoint_id,
                event_type = %job.event_type,
                next_attempt = attempt,
                delay_secs = delay.as_secs(),
                "Webhook delivery retry scheduled"
            );
            Ok(WebhookJobOutcome::RetryScheduled { attempt, delay })
        }
        RetryDecision::Exhausted => {
            let attempts = job.attempt;
            let entry = DeadLetterEntry::new(
                job,
                attempts,
                format!("HTTP {status_code}: {body}"),
            );
            error!(
                endpoint_id = %entry.job.endpoint_id,
                event_type = %entry.job.event_type,
                attempts = entry.attempts,
                status_code,
                last_error = %entry.last_error,
                "Webhook delivery failed permanently"
            );
            Ok(WebhookJobOutcome::Exhausted(entry))
        }
    }
}
