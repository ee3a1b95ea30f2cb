//! Job queue abstraction over apalis storages.

use std::marker::PhantomData;
use std::time::Duration;

use apalis::prelude::Storage;
use apalis_redis::RedisStorage;
use async_trait::async_trait;
use chrono::Utc;
use dashpilot_common::{AppError, AppResult};
use serde::{Serialize, de::DeserializeOwned};

/// A queue jobs can be pushed to, now or later.
#[async_trait]
pub trait JobQueue<J>: Send + Sync {
    /// Enqueue `job` to run as soon as a worker is free.
    async fn push(&self, job: J) -> AppResult<()>;

    /// Enqueue `job` to run no earlier than `delay` from now.
    async fn schedule(&self, job: J, delay: Duration) -> AppResult<()>;
}

/// [`JobQueue`] backed by an apalis Redis storage.
pub struct ApalisQueue<J> {
    storage: RedisStorage<J>,
    _job: PhantomData<fn() -> J>,
}

impl<J> Clone for ApalisQueue<J> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            _job: PhantomData,
        }
    }
}

impl<J> ApalisQueue<J> {
    /// Wrap a Redis storage.
    #[must_use]
    pub const fn new(storage: RedisStorage<J>) -> Self {
        Self {
            storage,
            _job: PhantomData,
        }
    }
}

#[async_trait]
impl<J> JobQueue<J> for ApalisQueue<J>
where
    J: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static,
{
    async fn push(&self, job: J) -> AppResult<()> {
        self.storage
            .clone()
            .push(job)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue job: {e}")))?;
        Ok(())
    }

    async fn schedule(&self, job: J, delay: Duration) -> AppResult<()> {
        let delay_secs = i64::try_from(delay.as_secs()).unwrap_or(i64::MAX);
        let run_at = Utc::now().timestamp().saturating_add(delay_secs);
        self.storage
            .clone()
            .schedule(job, run_at)
            .await
            .map_err(|e| AppError::Queue(format!("Failed to schedule job: {e}")))?;
        Ok(())
    }
}
