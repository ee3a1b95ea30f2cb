//! HTTP API layer for dashpilot.
//!
//! This crate exposes webhook endpoint management to agency users:
//!
//! - **Endpoints**: create, update, delete and test webhooks, read delivery logs
//! - **Extractors**: Authentication
//! - **Middleware**: Bearer-token authentication
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
