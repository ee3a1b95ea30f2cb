//! Single-owner leases for periodic jobs.
//!
//! Every scheduler instance ticks, but only the instance holding the lease
//! for a job runs it. The holder refreshes the lease on each tick; if it
//! stops, the lease expires and another instance takes over.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashpilot_common::{AppError, AppResult};
use fred::clients::Client as RedisClient;
use fred::interfaces::{KeysInterface, LuaInterface};
use fred::types::{Expiration, SetOptions};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// A lease that at most one scheduler instance holds at a time.
#[async_trait]
pub trait SchedulerLease: Send + Sync {
    /// Acquire or refresh the lease on `key` for `ttl`.
    ///
    /// Returns `true` when this instance holds the lease afterwards.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> AppResult<bool>;
}

/// Extend the TTL only if `KEYS[1]` still holds `ARGV[1]`.
const REFRESH_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
";

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1)
}

/// Lease stored in Redis with `SET NX PX`.
#[derive(Clone)]
pub struct RedisSchedulerLease {
    redis: RedisClient,
    owner: String,
}

impl RedisSchedulerLease {
    /// Create a lease handle identifying this instance as `owner`.
    #[must_use]
    pub const fn new(redis: RedisClient, owner: String) -> Self {
        Self { redis, owner }
    }
}

#[async_trait]
impl SchedulerLease for RedisSchedulerLease {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let millis = ttl_millis(ttl);

        // NX returns None if the key already exists
        let acquired: Option<String> = self
            .redis
            .set(
                key,
                self.owner.as_str(),
                Some(Expiration::PX(millis)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        if acquired.is_some() {
            debug!(key = %key, owner = %self.owner, "Acquired scheduler lease");
            return Ok(true);
        }

        let refreshed: i64 = self
            .redis
            .eval(
                REFRESH_SCRIPT,
                key,
                vec![self.owner.clone(), millis.to_string()],
            )
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(refreshed == 1)
    }
}

type LeaseTable = HashMap<String, (String, Instant)>;

/// In-process lease for single-instance deployments.
///
/// Handles created with [`LocalSchedulerLease::sharing`] compete for the
/// same table, like separate instances sharing one Redis.
#[derive(Clone)]
pub struct LocalSchedulerLease {
    owner: String,
    leases: Arc<Mutex<LeaseTable>>,
}

impl LocalSchedulerLease {
    /// Create a lease table with one handle owned by `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            leases: Arc::default(),
        }
    }

    /// Another handle on the same table, owned by `owner`.
    #[must_use]
    pub fn sharing(&self, owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            leases: Arc::clone(&self.leases),
        }
    }
}

#[async_trait]
impl SchedulerLease for LocalSchedulerLease {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock().await;

        let held_by_other = leases
            .get(key)
            .is_some_and(|(holder, expires_at)| holder != &self.owner && *expires_at > now);
        if held_by_other {
            return Ok(false);
        }

        leases.insert(key.to_string(), (self.owner.clone(), now + ttl));
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &str = "dashpilot:lease:test";

    #[tokio::test]
    async fn test_single_owner() {
        let a = LocalSchedulerLease::new("a");
        let b = a.sharing("b");
        let ttl = Duration::from_secs(600);

        assert!(a.try_acquire(KEY, ttl).await.unwrap());
        assert!(!b.try_acquire(KEY, ttl).await.unwrap());
        // The holder refreshes.
        assert!(a.try_acquire(KEY, ttl).await.unwrap());
        assert!(!b.try_acquire(KEY, ttl).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_moves_to_another_owner() {
        let a = LocalSchedulerLease::new("a");
        let b = a.sharing("b");
        let ttl = Duration::from_secs(600);

        assert!(a.try_acquire(KEY, ttl).await.unwrap());
        tokio::time::advance(Duration::from_secs(601)).await;

        assert!(b.try_acquire(KEY, ttl).await.unwrap());
        assert!(!a.try_acquire(KEY, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let a = LocalSchedulerLease::new("a");
        let b = a.sharing("b");
        let ttl = Duration::from_secs(60);

        assert!(a.try_acquire("one", ttl).await.unwrap());
        assert!(b.try_acquire("two", ttl).await.unwrap());
    }

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(600)), 600_000);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
    }
}
