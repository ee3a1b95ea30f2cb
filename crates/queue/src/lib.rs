//! Background job queue for DashPilot.
//!
//! This crate provides asynchronous job processing using Redis:
//!
//! - **Jobs**: webhook delivery attempts, site health checks
//! - **Workers**: job execution with Apalis
//! - **Retry**: fixed backoff table with a three-attempt ceiling
//! - **Scheduler**: periodic health-check fan-out behind a leader lease

pub mod delivery_impl;
pub mod jobs;
pub mod lease;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod workers;

pub use delivery_impl::RedisWebhookDelivery;
pub use jobs::*;
pub use lease::{LocalSchedulerLease, RedisSchedulerLease, SchedulerLease};
pub use retry::{DeadLetterEntry, RetryDecision, RetryPolicy};
pub use scheduler::{
    HEALTH_CHECK_LEASE_KEY, HealthCheckDispatcher, JobExecutor, SchedulerConfig, run_scheduler,
    run_tick,
};
pub use storage::{ApalisQueue, JobQueue};
pub use workers::*;
