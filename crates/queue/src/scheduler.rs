//! Periodic health-check fan-out.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use dashpilot_common::AppResult;
use dashpilot_common::config::SchedulerSettings;
use dashpilot_core::HealthCheckService;
use tokio::time::{MissedTickBehavior, interval};

use crate::jobs::SiteHealthCheckJob;
use crate::lease::SchedulerLease;
use crate::storage::JobQueue;

/// Lease key guarding the health-check fan-out.
pub const HEALTH_CHECK_LEASE_KEY: &str = "dashpilot:scheduler:health_check";

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between health-check fan-outs (default: 5 minutes).
    pub health_check_interval: Duration,
    /// How long the lease survives without a refresh (default: 10 minutes).
    pub lease_ttl: Duration,
    /// Lease key for the health-check fan-out.
    pub lease_key: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(300),
            lease_ttl: Duration::from_secs(600),
            lease_key: HEALTH_CHECK_LEASE_KEY.to_string(),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            health_check_interval: Duration::from_secs(settings.health_check_interval_secs),
            lease_ttl: Duration::from_secs(settings.lease_ttl_secs),
            ..Self::default()
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Queue one health check per non-archived site. Returns the count queued.
    async fn dispatch_health_checks(&self) -> AppResult<u64>;
}

/// Executor that queues a [`SiteHealthCheckJob`] for each site.
#[derive(Clone)]
pub struct HealthCheckDispatcher {
    health_service: HealthCheckService,
    queue: Arc<dyn JobQueue<SiteHealthCheckJob>>,
}

impl HealthCheckDispatcher {
    /// Create a new dispatcher.
    #[must_use]
    pub fn new(
        health_service: HealthCheckService,
        queue: Arc<dyn JobQueue<SiteHealthCheckJob>>,
    ) -> Self {
        Self {
            health_service,
            queue,
        }
    }
}

#[async_trait::async_trait]
impl JobExecutor for HealthCheckDispatcher {
    async fn dispatch_health_checks(&self) -> AppResult<u64> {
        let sites = self.health_service.sites_to_check().await?;
        let mut queued = 0;
        for site in sites {
            self.queue.push(SiteHealthCheckJob::new(site.id)).await?;
            queued += 1;
        }
        Ok(queued)
    }
}

/// Run one scheduler tick.
///
/// Returns `Some(count)` when this instance held the lease and dispatched,
/// `None` when another instance holds it.
pub async fn run_tick<E: JobExecutor + ?Sized>(
    config: &SchedulerConfig,
    lease: &dyn SchedulerLease,
    executor: &E,
) -> AppResult<Option<u64>> {
    if !lease.try_acquire(&config.lease_key, config.lease_ttl).await? {
        tracing::debug!(key = %config.lease_key, "Scheduler lease held elsewhere, skipping");
        return Ok(None);
    }

    let count = executor.dispatch_health_checks().await?;
    tracing::info!(count, "Dispatched site health checks");
    Ok(Some(count))
}

/// Run the scheduler with the given configuration, lease and executor.
///
/// Each tick is awaited before the next one starts and missed ticks are
/// skipped, so fan-outs never overlap.
pub async fn run_scheduler<E: JobExecutor + 'static>(
    config: SchedulerConfig,
    lease: Arc<dyn SchedulerLease>,
    executor: Arc<E>,
) {
    let mut interval = interval(config.health_check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if let Err(e) = run_tick(&config, lease.as_ref(), executor.as_ref()).await {
            tracing::error!(error = %e, "Site health check dispatch failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::lease::LocalSchedulerLease;
    use dashpilot_common::AppError;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Counts runs and the highest number of runs in flight at once.
    #[derive(Default)]
    struct SlowExecutor {
        runs: AtomicU64,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        duration: Duration,
    }

    #[async_trait::async_trait]
    impl JobExecutor for SlowExecutor {
        async fn dispatch_health_checks(&self) -> AppResult<u64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.runs.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct FailingExecutor;

    #[async_trait::async_trait]
    impl JobExecutor for FailingExecutor {
        async fn dispatch_health_checks(&self) -> AppResult<u64> {
            Err(AppError::Database("connection reset".to_string()))
        }
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.health_check_interval, Duration::from_secs(300));
        assert_eq!(config.lease_ttl, Duration::from_secs(600));
        assert_eq!(config.lease_key, HEALTH_CHECK_LEASE_KEY);
    }

    #[test]
    fn test_scheduler_config_from_settings() {
        let settings = SchedulerSettings {
            health_check_interval_secs: 60,
            lease_ttl_secs: 120,
        };
        let config = SchedulerConfig::from(&settings);
        assert_eq!(config.health_check_interval, Duration::from_secs(60));
        assert_eq!(config.lease_ttl, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_only_lease_holder_dispatches() {
        let config = SchedulerConfig::default();
        let leader = LocalSchedulerLease::new("a");
        let follower = leader.sharing("b");
        let executor = SlowExecutor::default();

        assert_eq!(run_tick(&config, &leader, &executor).await.unwrap(), Some(1));
        assert_eq!(run_tick(&config, &follower, &executor).await.unwrap(), None);
        assert_eq!(run_tick(&config, &leader, &executor).await.unwrap(), Some(2));
        assert_eq!(executor.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tick_propagates_executor_errors() {
        let config = SchedulerConfig::default();
        let lease = LocalSchedulerLease::new("a");

        let result = run_tick(&config, &lease, &FailingExecutor).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_runs_never_overlap() {
        let config = SchedulerConfig {
            health_check_interval: Duration::from_secs(300),
            ..SchedulerConfig::default()
        };
        let executor = Arc::new(SlowExecutor {
            duration: Duration::from_secs(700),
            ..SlowExecutor::default()
        });
        let lease: Arc<dyn SchedulerLease> = Arc::new(LocalSchedulerLease::new("a"));

        let handle = tokio::spawn(run_scheduler(config, lease, Arc::clone(&executor)));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        handle.abort();

        let runs = executor.runs.load(Ordering::SeqCst);
        assert!(runs >= 4, "expected several runs, got {runs}");
        assert!(runs <= 6, "runs should not pile up, got {runs}");
        assert_eq!(executor.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
