//! Database integration tests.
//!
//! Tests marked `#[ignore]` require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `dashpilot_test`)
//!   `TEST_DB_PASSWORD` (default: `dashpilot_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use dashpilot_db::entities::{site, user, webhook_delivery, webhook_endpoint};
use dashpilot_db::repositories::{
    SiteRepository, UserRepository, WebhookDeliveryRepository, WebhookEndpointRepository,
};
use dashpilot_db::test_utils::TestDatabase;
use sea_orm::{ActiveModelTrait, DatabaseBackend, MockDatabase, Set};
use serde_json::json;

fn endpoint(id: &str, events: serde_json::Value, is_active: bool) -> webhook_endpoint::Model {
    webhook_endpoint::Model {
        id: id.to_string(),
        user_id: "user1".to_string(),
        url: "https://hooks.agency.io/in".to_string(),
        secret: None,
        is_active,
        events,
        last_triggered_at: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

#[tokio::test]
async fn test_find_active_by_event_filters_subscriptions() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                endpoint("wh1", json!(["site.down", "site.up"]), true),
                endpoint("wh2", json!(["alert.created"]), true),
            ]])
            .into_connection(),
    );

    let repo = WebhookEndpointRepository::new(db);
    let found = repo
        .find_active_by_user_and_event("user1", "site.down")
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "wh1");
}

#[tokio::test]
async fn test_get_by_id_not_found() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<webhook_endpoint::Model>::new()])
            .into_connection(),
    );

    let repo = WebhookEndpointRepository::new(db);
    let result = repo.get_by_id("missing").await;

    assert!(matches!(
        result,
        Err(dashpilot_common::AppError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delivery_log_roundtrip() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(db.connection().clone());

    let owner = user::ActiveModel {
        id: Set("user1".to_string()),
        name: Set("Agency".to_string()),
        email: Set("ops@agency.io".to_string()),
        api_token: Set("token-1".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn.as_ref())
    .await
    .unwrap();

    let users = UserRepository::new(Arc::clone(&conn));
    assert_eq!(
        users.find_by_token("token-1").await.unwrap().map(|u| u.id),
        Some(owner.id.clone())
    );

    let endpoints = WebhookEndpointRepository::new(Arc::clone(&conn));
    let created = endpoints
        .create(webhook_endpoint::ActiveModel {
            id: Set("wh1".to_string()),
            user_id: Set(owner.id.clone()),
            url: Set("https://hooks.agency.io/in".to_string()),
            secret: Set(Some("s3cret".to_string())),
            is_active: Set(true),
            events: Set(json!(["site.down"])),
            last_triggered_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();
    assert!(created.last_triggered_at.is_none());

    let deliveries = WebhookDeliveryRepository::new(Arc::clone(&conn));
    deliveries
        .create(webhook_delivery::ActiveModel {
            id: Set("d1".to_string()),
            webhook_id: Set("wh1".to_string()),
            event_type: Set("site.down".to_string()),
            payload: Set(json!({ "event": "site.down" })),
            status_code: Set(200),
            response_body: Set(Some("ok".to_string())),
            attempt: Set(1),
            success: Set(true),
            error_message: Set(None),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    endpoints.mark_triggered("wh1", Utc::now()).await.unwrap();

    let log = deliveries.find_by_webhook_id("wh1", 10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].attempt, 1);
    assert!(endpoints.get_by_id("wh1").await.unwrap().last_triggered_at.is_some());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_unarchived_sites() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(db.connection().clone());

    user::ActiveModel {
        id: Set("user1".to_string()),
        name: Set("Agency".to_string()),
        email: Set("ops@agency.io".to_string()),
        api_token: Set("token-1".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn.as_ref())
    .await
    .unwrap();

    for (id, archived) in [("s1", false), ("s2", true), ("s3", false)] {
        site::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set("user1".to_string()),
            name: Set(format!("Site {id}")),
            url: Set(format!("https://{id}.example.com")),
            platform: Set(site::SitePlatform::WordPress),
            is_archived: Set(archived),
            status: Set(site::SiteStatus::Unknown),
            last_checked_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(conn.as_ref())
        .await
        .unwrap();
    }

    let sites = SiteRepository::new(Arc::clone(&conn));
    let ids: Vec<String> = sites
        .find_unarchived()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["s1".to_string(), "s3".to_string()]);

    sites
        .update_status("s1", site::SiteStatus::Down, Utc::now())
        .await
        .unwrap();
    assert_eq!(sites.get_by_id("s1").await.unwrap().status, site::SiteStatus::Down);

    db.drop_database().await.unwrap();
}
