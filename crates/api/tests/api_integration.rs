//! API integration tests.
//!
//! These tests drive the router through the auth middleware with a mocked
//! database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
};
use chrono::Utc;
use dashpilot_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use dashpilot_common::config::WebhookConfig;
use dashpilot_common::{StaticResolver, UrlGuard};
use dashpilot_core::{UserService, WebhookDispatcher, WebhookService};
use dashpilot_db::entities::{user, webhook_endpoint};
use dashpilot_db::repositories::{
    UserRepository, WebhookDeliveryRepository, WebhookEndpointRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::{Value, json};
use tower::ServiceExt;

const TOKEN: &str = "tok-agency";

fn test_user() -> user::Model {
    user::Model {
        id: "user1".to_string(),
        name: "Agency Ops".to_string(),
        email: "ops@agency.io".to_string(),
        api_token: TOKEN.to_string(),
        created_at: Utc::now().into(),
    }
}

fn test_endpoint(id: &str, user_id: &str) -> webhook_endpoint::Model {
    webhook_endpoint::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        url: "https://hooks.agency.io/in".to_string(),
        secret: Some("s3cret".to_string()),
        is_active: true,
        events: json!(["site.down", "site.up"]),
        last_triggered_at: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Create the router with the auth middleware, as the server mounts it.
fn create_test_router(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let endpoint_repo = WebhookEndpointRepository::new(Arc::clone(&db));
    let delivery_repo = WebhookDeliveryRepository::new(Arc::clone(&db));
    let dispatcher = WebhookDispatcher::new(
        delivery_repo.clone(),
        endpoint_repo.clone(),
        &WebhookConfig::default(),
    );

    let state = AppState {
        user_service: UserService::new(UserRepository::new(Arc::clone(&db))),
        webhook_service: WebhookService::new(
            endpoint_repo,
            delivery_repo,
            dispatcher,
            UrlGuard::new(Arc::new(StaticResolver::new())),
        ),
    };

    api_router()
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_without_token_returns_401() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(post_json("/webhooks/list", None, &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_token_returns_401() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json("/webhooks/list", Some("wrong"), &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_with_loopback_url_returns_400() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user()]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json(
            "/webhooks/create",
            Some(TOKEN),
            &json!({ "url": "http://localhost:8080/hook", "events": ["site.down"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_with_unknown_event_returns_400() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user()]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json(
            "/webhooks/create",
            Some(TOKEN),
            &json!({ "url": "https://hooks.agency.io/in", "events": ["note.created"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_hides_secrets() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user()]])
        .append_query_results([[test_endpoint("wh1", "user1")]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json("/webhooks/list", Some(TOKEN), &json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let first = &body["data"][0];
    assert_eq!(first["id"], "wh1");
    assert_eq!(first["hasSecret"], true);
    assert_eq!(first["events"], json!(["site.down", "site.up"]));
    assert!(first.get("secret").is_none());
}

#[tokio::test]
async fn test_show_other_users_webhook_returns_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user()]])
        .append_query_results([[test_endpoint("wh2", "someone-else")]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json(
            "/webhooks/show",
            Some(TOKEN),
            &json!({ "webhookId": "wh2" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
