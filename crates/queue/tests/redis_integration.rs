//! Redis integration tests.
//!
//! These tests require a running Redis instance.
//! Run with: `cargo test --test redis_integration -- --ignored`
//!
//! Set `REDIS_URL` environment variable to point to your Redis instance.
//! Default: <redis://localhost:6379>

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use apalis_redis::RedisStorage;
use dashpilot_queue::{
    ApalisQueue, JobQueue, RedisSchedulerLease, SchedulerLease, WebhookDeliveryJob,
};
use fred::clients::Client;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::config::Config as RedisConfig;
use serde_json::json;

fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn fred_client() -> Client {
    let config = RedisConfig::from_url(&get_redis_url()).expect("Invalid Redis URL");
    let client = Client::new(config, None, None, None);
    client.init().await.expect("Failed to connect to Redis");
    client
}

fn unique_key(name: &str) -> String {
    format!(
        "dashpilot:test:{name}:{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Only one instance holds the lease; the holder can refresh it.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_redis_lease_single_owner() {
    let client = fred_client().await;
    let key = unique_key("lease");
    let ttl = Duration::from_secs(5);

    let a = RedisSchedulerLease::new(client.clone(), "instance-a".to_string());
    let b = RedisSchedulerLease::new(client.clone(), "instance-b".to_string());

    assert!(a.try_acquire(&key, ttl).await.unwrap());
    assert!(!b.try_acquire(&key, ttl).await.unwrap());
    assert!(a.try_acquire(&key, ttl).await.unwrap());

    let _: i64 = client.del(&key).await.unwrap();
    assert!(b.try_acquire(&key, ttl).await.unwrap());

    let _: i64 = client.del(&key).await.unwrap();
}

/// Refreshing extends the TTL only for the instance that holds the lease.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_redis_lease_refresh_only_extends_own_lease() {
    let client = fred_client().await;
    let key = unique_key("refresh");

    let a = RedisSchedulerLease::new(client.clone(), "instance-a".to_string());
    let b = RedisSchedulerLease::new(client.clone(), "instance-b".to_string());

    assert!(a.try_acquire(&key, Duration::from_secs(2)).await.unwrap());

    assert!(!b.try_acquire(&key, Duration::from_secs(60)).await.unwrap());
    let ttl: i64 = client.pttl(&key).await.unwrap();
    assert!(ttl <= 2_000, "other instance extended the lease to {ttl}ms");

    assert!(a.try_acquire(&key, Duration::from_secs(60)).await.unwrap());
    let ttl: i64 = client.pttl(&key).await.unwrap();
    assert!(ttl > 2_000);

    let _: i64 = client.del(&key).await.unwrap();
}

/// An abandoned lease expires and another instance takes over.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_redis_lease_expires() {
    let client = fred_client().await;
    let key = unique_key("expiry");

    let a = RedisSchedulerLease::new(client.clone(), "instance-a".to_string());
    let b = RedisSchedulerLease::new(client.clone(), "instance-b".to_string());

    assert!(a.try_acquire(&key, Duration::from_millis(200)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(b.try_acquire(&key, Duration::from_secs(5)).await.unwrap());

    let _: i64 = client.del(&key).await.unwrap();
}

/// Jobs can be pushed and scheduled on the apalis Redis storage.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_apalis_queue_push_and_schedule() {
    let client = redis::Client::open(get_redis_url()).expect("Invalid Redis URL");
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .expect("Failed to connect to Redis");
    let storage = RedisStorage::<WebhookDeliveryJob>::new(conn);
    let queue = ApalisQueue::new(storage);

    let job = WebhookDeliveryJob::new(
        "wh1".to_string(),
        "site.down".to_string(),
        json!({ "event": "site.down" }),
    );

    queue.push(job.clone()).await.unwrap();
    queue
        .schedule(job.next_attempt(), Duration::from_secs(60))
        .await
        .unwrap();
}
