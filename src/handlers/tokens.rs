//! Provider credential handlers.
//!
//! - `POST /api/v1/cloud/{provider}/tokens/validate` - live check of a raw token
//! - `GET /api/v1/cloud/{provider}/tokens` - list the team's credentials
//! - `POST /api/v1/cloud/{provider}/tokens` - store a validated credential
//! - `PATCH /api/v1/cloud/{provider}/tokens/{id}` - rename a credential
//! - `DELETE /api/v1/cloud/{provider}/tokens/{id}` - delete an unused credential

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{parse_provider, AppState};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::middleware::auth::AuthenticatedTeam;
use crate::models::CredentialView;
use crate::services::credentials::{create_validated, require_credential, validate_token};

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameCredentialRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
    pub credentials: Vec<CredentialView>,
}

/// Always answers 200 with `{valid, message}`; provider failures are part of
/// the result, not an error response.
pub async fn validate_provider_token(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ValidateTokenRequest>,
) -> AppResult<HttpResponse> {
    let provider = parse_provider(&path)?;
    let result = validate_token(state.gateways.as_ref(), provider, &body.token).await;

    tracing::info!(
        team_id = %auth.team_id,
        provider = %provider,
        valid = result.valid,
        "Validated provider token"
    );

    Ok(HttpResponse::Ok().json(result))
}

pub async fn list_credentials(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let provider = parse_provider(&path)?;

    let credentials = state
        .credentials
        .list_for_team(auth.team_id)
        .await?
        .into_iter()
        .filter(|c| c.provider == provider.as_str())
        .collect();

    Ok(HttpResponse::Ok().json(CredentialsResponse { credentials }))
}

/// Stores the credential only after the token passed a live check.
pub async fn create_credential(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CreateCredentialRequest>,
) -> AppResult<HttpResponse> {
    let provider = parse_provider(&path)?;

    let view = create_validated(
        state.credentials.as_ref(),
        state.gateways.as_ref(),
        auth.team_id,
        provider,
        &body.name,
        &body.token,
    )
    .await?;

    Ok(HttpResponse::Created().json(view))
}

pub async fn rename_credential(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<RenameCredentialRequest>,
) -> AppResult<HttpResponse> {
    let (provider, credential_ref) = path.into_inner();
    let provider = parse_provider(&provider)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::InputValidation(FieldErrors::single(
            "name",
            "The name field is required.",
        )));
    }

    let credential =
        require_credential(state.credentials.as_ref(), auth.team_id, &credential_ref, provider).await?;

    let renamed = state
        .credentials
        .rename(auth.team_id, credential.id, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} credential not found", provider.display_name())))?;

    Ok(HttpResponse::Ok().json(renamed.view()))
}

/// Refused with 409 while any managed server still uses the credential.
pub async fn delete_credential(
    auth: AuthenticatedTeam,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (provider, credential_ref) = path.into_inner();
    let provider = parse_provider(&provider)?;

    let credential =
        require_credential(state.credentials.as_ref(), auth.team_id, &credential_ref, provider).await?;

    if !state.credentials.delete(auth.team_id, credential.id).await? {
        return Err(AppError::NotFound(format!(
            "{} credential not found",
            provider.display_name()
        )));
    }

    tracing::info!(
        credential_id = %credential.id,
        team_id = %auth.team_id,
        provider = %provider,
        "Deleted provider credential"
    );

    Ok(HttpResponse::NoContent().finish())
}
