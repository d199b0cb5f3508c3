//! Provider catalog handlers.
//!
//! - `GET /api/v1/cloud/{provider}/locations`
//! - `GET /api/v1/cloud/{provider}/instance-types`
//! - `GET /api/v1/cloud/{provider}/images`
//! - `GET /api/v1/cloud/{provider}/ssh-keys`
//!
//! All take `?credential_ref=<id>` naming one of the team's credentials.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{parse_provider, AppState};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::middleware::auth::AuthenticatedTeam;
use crate::models::{Image, InstanceType, Location, RemoteKey};
use crate::models::provisioning::CREDENTIAL_REF_FIELD;
use crate::services::credentials::require_credential;
use crate::services::provider::ProviderError;
use crate::services::ProviderGateway;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub credential_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
pub struct InstanceTypesResponse {
    pub instance_types: Vec<InstanceType>,
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub images: Vec<Image>,
}

#[derive(Debug, Serialize)]
pub struct SshKeysResponse {
    pub ssh_keys: Vec<RemoteKey>,
}

/// Upstream catalog failures are server errors carrying the provider's
/// message. Rate limits keep their 429 and retry hint.
fn upstream_failure(err: ProviderError) -> AppError {
    match err {
        ProviderError::RateLimited { retry_after } => AppError::RateLimited { retry_after },
        ProviderError::Auth => {
            AppError::Unexpected("provider rejected the credential token".to_string())
        }
        ProviderError::Validation(message) | ProviderError::Unexpected(message) => {
            AppError::Unexpected(message)
        }
        ProviderError::Unreachable(message) => {
            AppError::Unexpected(format!("provider unreachable: {}", message))
        }
    }
}

/// Resolve the provider segment and credential into a bound gateway.
async fn gateway_for(
    auth: &AuthenticatedTeam,
    state: &AppState,
    provider: &str,
    query: &CatalogQuery,
) -> AppResult<Arc<dyn ProviderGateway>> {
    let provider = parse_provider(provider)?;

    let credential_ref = query
        .credential_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            AppError::InputValidation(FieldErrors::single(
                CREDENTIAL_REF_FIELD,
                format!("The {} field is required.", CREDENTIAL_REF_FIELD),
            ))
        })?;

    let credential =
        require_credential(state.credentials.as_ref(), auth.team_id, credential_ref, provider).await?;
    Ok(state.gateways.gateway(provider, &credential.token))
}

pub async fn list_locations(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CatalogQuery>,
) -> AppResult<HttpResponse> {
    let gateway = gateway_for(&auth, &state, &path, &query).await?;
    let locations = gateway.list_locations().await.map_err(upstream_failure)?;
    Ok(HttpResponse::Ok().json(LocationsResponse { locations }))
}

pub async fn list_instance_types(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CatalogQuery>,
) -> AppResult<HttpResponse> {
    let gateway = gateway_for(&auth, &state, &path, &query).await?;
    let instance_types = gateway.list_instance_types().await.map_err(upstream_failure)?;
    Ok(HttpResponse::Ok().json(InstanceTypesResponse { instance_types }))
}

pub async fn list_images(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CatalogQuery>,
) -> AppResult<HttpResponse> {
    let gateway = gateway_for(&auth, &state, &path, &query).await?;
    let images = gateway.list_images().await.map_err(upstream_failure)?;
    Ok(HttpResponse::Ok().json(ImagesResponse { images }))
}

pub async fn list_ssh_keys(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CatalogQuery>,
) -> AppResult<HttpResponse> {
    let gateway = gateway_for(&auth, &state, &path, &query).await?;
    let ssh_keys = gateway.list_account_keys().await.map_err(upstream_failure)?;
    Ok(HttpResponse::Ok().json(SshKeysResponse { ssh_keys }))
}
