//! Common utilities and shared types for dashpilot.
//!
//! This crate provides foundational components used across all dashpilot crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Signatures**: HMAC-SHA256 signing of outbound webhook payloads
//! - **URL Guard**: SSRF protection for user-supplied webhook URLs
//!
//! # Example
//!
//! ```no_run
//! use dashpilot_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod signature;
pub mod url_guard;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use url_guard::{HostResolver, StaticResolver, SystemResolver, UrlCheck, UrlGuard};
