//! Webhook endpoints.

use axum::{Json, Router, extract::State, routing::post};
use dashpilot_common::AppResult;
use dashpilot_core::{
    CreateWebhookInput, DeliveryResponse, TestWebhookResponse, UpdateWebhookInput,
    WebhookResponse, WebhookWithSecretResponse,
};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Request naming a single webhook.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookIdRequest {
    pub webhook_id: String,
}

/// Request to update a webhook.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookRequest {
    pub webhook_id: String,
    #[serde(flatten)]
    pub input: UpdateWebhookInput,
}

/// Request for a webhook's delivery log.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveriesRequest {
    pub webhook_id: String,
    pub limit: Option<u64>,
}

/// Create a new webhook.
async fn create_webhook(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateWebhookInput>,
) -> AppResult<ApiResponse<WebhookWithSecretResponse>> {
    let webhook = state.webhook_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(webhook))
}

/// List webhooks for the current user.
async fn list_webhooks(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<WebhookResponse>>> {
    let webhooks = state.webhook_service.list(&user.id).await?;
    Ok(ApiResponse::ok(webhooks))
}

async fn get_webhook(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<WebhookIdRequest>,
) -> AppResult<ApiResponse<WebhookResponse>> {
    let webhook = state.webhook_service.get(&user.id, &req.webhook_id).await?;
    Ok(ApiResponse::ok(webhook))
}

async fn update_webhook(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateWebhookRequest>,
) -> AppResult<ApiResponse<WebhookResponse>> {
    let webhook = state
        .webhook_service
        .update(&user.id, &req.webhook_id, req.input)
        .await?;
    Ok(ApiResponse::ok(webhook))
}

async fn delete_webhook(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<WebhookIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .webhook_service
        .delete(&user.id, &req.webhook_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Rotate the signing secret. The new secret is returned once.
async fn regenerate_secret(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<WebhookIdRequest>,
) -> AppResult<ApiResponse<WebhookWithSecretResponse>> {
    let webhook = state
        .webhook_service
        .regenerate_secret(&user.id, &req.webhook_id)
        .await?;
    Ok(ApiResponse::ok(webhook))
}

/// Recent delivery attempts, newest first.
async fn list_deliveries(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeliveriesRequest>,
) -> AppResult<ApiResponse<Vec<DeliveryResponse>>> {
    let deliveries = state
        .webhook_service
        .deliveries(&user.id, &req.webhook_id, req.limit)
        .await?;
    Ok(ApiResponse::ok(deliveries))
}

/// Send a `webhook.test` event right away, without retries.
async fn test_webhook(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<WebhookIdRequest>,
) -> AppResult<ApiResponse<TestWebhookResponse>> {
    let result = state
        .webhook_service
        .test(&user.id, &req.webhook_id)
        .await?;
    Ok(ApiResponse::ok(result))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_webhook))
        .route("/list", post(list_webhooks))
        .route("/show", post(get_webhook))
        .route("/update", post(update_webhook))
        .route("/delete", post(delete_webhook))
        .route("/regenerate-secret", post(regenerate_secret))
        .route("/deliveries", post(list_deliveries))
        .route("/test", post(test_webhook))
}
