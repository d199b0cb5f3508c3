//! Authentication middleware for JWT validation.
//!
//! This module provides:
//! - `AuthenticatedTeam` extractor that validates JWT tokens
//! - Extraction of the acting user and team from valid tokens

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::handlers::AppState;
use crate::services::token::decode_access_token;

/// The caller of a team-scoped route, resolved from a valid JWT.
///
/// Every store lookup downstream is filtered by `team_id`.
///
/// # Example
///
/// ```ignore
/// use crate::middleware::auth::AuthenticatedTeam;
///
/// async fn protected_route(auth: AuthenticatedTeam) -> impl Responder {
///     format!("Hello, team {}", auth.team_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedTeam {
    pub user_id: Uuid,
    pub team_id: Uuid,
}

/// Error type for authentication failures.
#[derive(Debug)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader,
    /// Token validation failed
    InvalidToken,
    /// `sub` or `team_id` claim is not a valid UUID
    InvalidClaims,
    /// App state not found
    MissingAppState,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidHeader => write!(f, "Invalid authorization header format"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::InvalidClaims => write!(f, "Invalid user or team in token"),
            AuthError::MissingAppState => write!(f, "Internal server error"),
        }
    }
}

impl actix_web::ResponseError for AuthError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidHeader
            | AuthError::InvalidToken
            | AuthError::InvalidClaims => actix_web::http::StatusCode::UNAUTHORIZED,
            AuthError::MissingAppState => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let body = serde_json::json!({
            "error": self.to_string()
        });
        actix_web::HttpResponse::build(self.status_code()).json(body)
    }
}

impl FromRequest for AuthenticatedTeam {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedTeam, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidHeader)?;

    let app_state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(AuthError::MissingAppState)?;

    let claims = decode_access_token(token.trim(), &app_state.config.jwt_secret)
        .map_err(|_| AuthError::InvalidToken)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidClaims)?;
    let team_id = Uuid::parse_str(&claims.team_id).map_err(|_| AuthError::InvalidClaims)?;

    Ok(AuthenticatedTeam { user_id, team_id })
}
