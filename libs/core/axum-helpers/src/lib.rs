//! # Axum Helpers
//!
//! Shared building blocks for the HTTP services in this workspace.
//!
//! - **[`server`]**: router assembly, serving, graceful shutdown
//! - **[`health`]**: liveness and readiness endpoints
//! - **[`extractors`]**: validated JSON bodies and query strings, UUID path parameters
//!
//! ```ignore
//! use axum_helpers::{create_app, create_router, health_router};
//!
//! let router = create_router::<ApiDoc>(api_routes)?
//!     .merge(health_router(app_info!()));
//! create_app(router, &ServerConfig::from_env()?).await?;
//! ```

pub mod extractors;
pub mod health;
pub mod server;

pub use extractors::{UuidPath, ValidatedJson, ValidatedQuery};
pub use health::{HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use server::{create_app, create_router, error_body, shutdown_signal};
