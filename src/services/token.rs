//! JWT access tokens identifying the calling user and team.
//!
//! Tokens are issued by the account service; this API only verifies them.
//! `create_access_token` exists for operators and tests.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure for access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - the user ID as a string
    pub sub: String,
    /// Team the request acts on behalf of
    pub team_id: String,
    /// Expiration time as Unix timestamp
    pub exp: i64,
    /// Issued at time as Unix timestamp
    pub iat: i64,
}

/// Creates a JWT access token for a user acting within a team.
///
/// # Example
///
/// ```
/// use cloudprov_api::services::token::create_access_token;
/// use uuid::Uuid;
///
/// let token = create_access_token(Uuid::new_v4(), Uuid::new_v4(), "my_secret", 3600)
///     .expect("Failed to create token");
/// assert!(!token.is_empty());
/// ```
pub fn create_access_token(
    user_id: Uuid,
    team_id: Uuid,
    secret: &str,
    expiry_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        team_id: team_id.to_string(),
        exp: now + expiry_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decodes and validates a JWT access token.
pub fn decode_access_token(
    token: &str,
    secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
