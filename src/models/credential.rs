//! Provider credential model - a team's API token for one compute provider.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Provider credential from database.
///
/// Not `Serialize`; the token only leaves the process inside provider API
/// calls. Use [`ProviderCredential::view`] for outward output.
#[derive(Clone, FromRow)]
pub struct ProviderCredential {
    pub id: Uuid,
    pub team_id: Uuid,
    pub provider: String,
    pub token: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("id", &self.id)
            .field("team_id", &self.team_id)
            .field("provider", &self.provider)
            .field("token", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

impl ProviderCredential {
    pub fn view(&self) -> CredentialView {
        CredentialView {
            id: self.id,
            team_id: self.team_id,
            provider: self.provider.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Outward representation of a credential (token redacted).
#[derive(Debug, Clone, Serialize)]
pub struct CredentialView {
    pub id: Uuid,
    pub team_id: Uuid,
    pub provider: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
