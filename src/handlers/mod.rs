//! HTTP handlers for the cloudprov-api application.
//!
//! This module contains all the route handlers:
//! - `servers` - Server provisioning
//! - `catalog` - Provider locations, instance types, images and account keys
//! - `tokens` - Provider token validation and credential lifecycle
//! - `health` - Health check endpoint

pub mod catalog;
pub mod health;
pub mod servers;
pub mod state;
pub mod tokens;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::ProviderFamily;

// Re-export commonly used types
pub use catalog::{list_images, list_instance_types, list_locations, list_ssh_keys, CatalogQuery};
pub use health::{health_check, HealthResponse};
pub use servers::create_server;
pub use state::AppState;
pub use tokens::{
    create_credential, delete_credential, list_credentials, rename_credential,
    validate_provider_token, ValidateTokenRequest,
};

/// Request bodies carry cloud-init scripts, so allow more than the default.
const JSON_LIMIT: usize = 256 * 1024;

/// Unknown provider segments are reported as missing resources.
pub(crate) fn parse_provider(segment: &str) -> AppResult<ProviderFamily> {
    ProviderFamily::parse(segment)
        .ok_or_else(|| AppError::NotFound(format!("Unknown provider: {}", segment)))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::InputValidation(FieldErrors::single("body", err.to_string())).into()
}

/// Register the health check and the `/api/v1` routes.
///
/// Shared by the binary and the integration tests; middleware is added by
/// the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(json_error))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/v1/cloud/{provider}")
                .route("/servers", web::post().to(create_server))
                .route("/locations", web::get().to(list_locations))
                .route("/instance-types", web::get().to(list_instance_types))
                .route("/images", web::get().to(list_images))
                .route("/ssh-keys", web::get().to(list_ssh_keys))
                .route("/tokens/validate", web::post().to(validate_provider_token))
                .route("/tokens", web::get().to(list_credentials))
                .route("/tokens", web::post().to(create_credential))
                .route("/tokens/{id}", web::patch().to(rename_credential))
                .route("/tokens/{id}", web::delete().to(delete_credential)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("hetzner").unwrap(), ProviderFamily::Hetzner);
        assert_eq!(parse_provider("DigitalOcean").unwrap(), ProviderFamily::DigitalOcean);
        assert!(matches!(parse_provider("vultr"), Err(AppError::NotFound(_))));
    }
}
