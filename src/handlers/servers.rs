//! Server provisioning handler.
//!
//! - `POST /api/v1/cloud/{provider}/servers` - create and register a server

use actix_web::{web, HttpResponse};
use serde_json::Value;

use super::{parse_provider, AppState};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedTeam;
use crate::models::ProvisioningRequest;

/// Create a server on the provider and register it for the caller's team.
///
/// The body is validated against the field allow-list before anything else
/// runs; unknown fields are reported by name with a 422.
pub async fn create_server(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let provider = parse_provider(&path)?;
    let request = ProvisioningRequest::from_json(&body).map_err(AppError::InputValidation)?;

    tracing::info!(
        team_id = %auth.team_id,
        user_id = %auth.user_id,
        provider = %provider,
        location = %request.location,
        instance_type = %request.instance_type,
        "Provisioning server"
    );

    let response = state
        .provisioner()
        .provision(auth.team_id, provider, request)
        .await?;

    Ok(HttpResponse::Created().json(response))
}
