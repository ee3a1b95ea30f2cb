//! Core business logic for DashPilot webhooks and site health checks.

pub mod services;

pub use services::*;
