//! DashPilot server entry point.

use std::sync::Arc;

use apalis::prelude::*;
use apalis_redis::RedisStorage;
use axum::{Router, middleware, routing::get};
use dashpilot_api::{middleware::AppState, router as api_router};
use dashpilot_common::{Config, IdGenerator, UrlGuard};
use dashpilot_core::{HealthCheckService, UserService, WebhookDispatcher, WebhookService};
use dashpilot_db::repositories::{
    SiteHealthCheckRepository, SiteRepository, UserRepository, WebhookDeliveryRepository,
    WebhookEndpointRepository,
};
use dashpilot_queue::workers::{
    HealthCheckWorkerContext, WebhookWorkerContext, health_check_worker, webhook_worker,
};
use dashpilot_queue::{
    ApalisQueue, HealthCheckDispatcher, RedisSchedulerLease, RedisWebhookDelivery,
    SchedulerConfig, SchedulerLease, SiteHealthCheckJob, WebhookDeliveryJob, run_scheduler,
};
use fred::interfaces::ClientLike;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashpilot=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting DashPilot server...");

    let config = Config::load()?;

    let db = Arc::new(dashpilot_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    dashpilot_db::migrate(&db).await?;
    info!("Migrations completed");

    // Job storages
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let webhook_storage = RedisStorage::<WebhookDeliveryJob>::new(redis_conn.clone());
    let health_check_storage = RedisStorage::<SiteHealthCheckJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    // fred client for the scheduler lease
    let fred_config = fred::types::config::Config::from_url(&config.redis.url)?;
    let fred_client = fred::clients::Client::new(fred_config, None, None, None);
    fred_client.connect();
    fred_client.wait_for_connect().await?;
    info!("Connected to Redis for scheduler lease");

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let site_repo = SiteRepository::new(Arc::clone(&db));
    let check_repo = SiteHealthCheckRepository::new(Arc::clone(&db));
    let endpoint_repo = WebhookEndpointRepository::new(Arc::clone(&db));
    let delivery_repo = WebhookDeliveryRepository::new(Arc::clone(&db));

    // Services
    let url_guard = UrlGuard::system().allow_http(config.webhook.allow_http);
    let dispatcher =
        WebhookDispatcher::new(delivery_repo.clone(), endpoint_repo.clone(), &config.webhook);
    let webhook_service = WebhookService::new(
        endpoint_repo.clone(),
        delivery_repo,
        dispatcher.clone(),
        url_guard,
    )
    .with_delivery(Arc::new(RedisWebhookDelivery::new(webhook_storage.clone())));
    let health_service = HealthCheckService::new(
        site_repo,
        check_repo,
        webhook_service.clone(),
        &config.health_check,
    );
    let user_service = UserService::new(user_repo);

    // Workers
    let webhook_ctx = WebhookWorkerContext::new(
        endpoint_repo,
        dispatcher,
        Arc::new(ApalisQueue::new(webhook_storage.clone())),
    );
    let health_check_ctx = HealthCheckWorkerContext::new(health_service.clone());
    let health_check_queue = Arc::new(ApalisQueue::new(health_check_storage.clone()));

    tokio::spawn(async move {
        let monitor = Monitor::new()
            .register({
                WorkerBuilder::new("webhook-delivery")
                    .data(webhook_ctx)
                    .backend(webhook_storage)
                    .build_fn(webhook_worker)
            })
            .register({
                WorkerBuilder::new("site-health-check")
                    .data(health_check_ctx)
                    .backend(health_check_storage)
                    .build_fn(health_check_worker)
            });

        if let Err(e) = monitor.run().await {
            tracing::error!(error = %e, "Job workers failed");
        }
    });
    info!("Webhook and health check workers started");

    // Scheduler
    let scheduler_config = SchedulerConfig {
        lease_key: format!("{}:scheduler:health_check", config.redis.prefix),
        ..SchedulerConfig::from(&config.scheduler)
    };
    let lease_owner = IdGenerator::new().generate();
    let lease: Arc<dyn SchedulerLease> =
        Arc::new(RedisSchedulerLease::new(fred_client, lease_owner.clone()));
    let executor = Arc::new(HealthCheckDispatcher::new(health_service, health_check_queue));
    tokio::spawn(run_scheduler(scheduler_config, lease, executor));
    info!(owner = %lease_owner, "Health check scheduler started");

    let state = AppState {
        user_service,
        webhook_service,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            dashpilot_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
