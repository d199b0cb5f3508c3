//! cloudprov-api - cloud server provisioning API
//!
//! Provisions compute instances on Hetzner Cloud and DigitalOcean from a
//! team's stored provider credential and SSH key, and registers them as
//! managed servers.
//!
//! # Modules
//!
//! - [`config`] - Application configuration from environment variables
//! - [`db`] - Database connection pool and migrations
//! - [`error`] - Unified error handling
//! - [`models`] - Credentials, keys, servers, catalog and request types
//! - [`services`] - Provider gateways, stores, key reconciliation, provisioning
//! - [`handlers`] - HTTP route handlers
//! - [`middleware`] - Authentication and rate limiting middleware
//!
//! # Quick Start
//!
//! ```ignore
//! use cloudprov_api::{Config, create_pool, run_migrations, AppState};
//! use cloudprov_api::handlers::configure;
//! use cloudprov_api::middleware::create_rate_limiter;
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

// Re-export commonly used types at the crate root
pub use config::{Config, ConfigError};
pub use db::{create_pool, run_migrations};
pub use error::{AppError, AppResult, FieldErrors, StoreError};
pub use handlers::AppState;
pub use models::{ManagedServer, ProviderCredential, ProviderFamily, ProvisioningRequest};
pub use services::{Claims, ProviderError, Provisioner};
