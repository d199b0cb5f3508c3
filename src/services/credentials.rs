//! Provider credential storage and live token validation.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors, StoreError};
use crate::models::{CredentialView, ProviderCredential, ProviderFamily};
use crate::services::provider::{GatewayFactory, ProviderError};

/// Team-scoped access to provider credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `None` when the reference is malformed, unknown, owned by another
    /// team, or bound to a different provider family.
    async fn lookup(
        &self,
        team_id: Uuid,
        credential_ref: &str,
        provider: ProviderFamily,
    ) -> Result<Option<ProviderCredential>, StoreError>;

    async fn create(
        &self,
        team_id: Uuid,
        provider: ProviderFamily,
        name: &str,
        token: &str,
    ) -> Result<ProviderCredential, StoreError>;

    /// Rename only; the token itself is immutable.
    async fn rename(
        &self,
        team_id: Uuid,
        id: Uuid,
        name: &str,
    ) -> Result<Option<ProviderCredential>, StoreError>;

    /// Fails with [`StoreError::CredentialInUse`] while servers reference it.
    /// Returns whether a row was removed.
    async fn delete(&self, team_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn list_for_team(&self, team_id: Uuid) -> Result<Vec<CredentialView>, StoreError>;
}

/// Outcome of a live token check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub message: String,
}

impl TokenValidation {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Check a token with one bounded read against the provider. Never fails;
/// every problem is reported as an invalid result.
pub async fn validate_token(
    gateways: &dyn GatewayFactory,
    provider: ProviderFamily,
    token: &str,
) -> TokenValidation {
    let token = token.trim();
    if token.is_empty() {
        return TokenValidation::invalid("Token is required.");
    }

    let name = provider.display_name();
    match gateways.gateway(provider, token).verify_token().await {
        Ok(()) => TokenValidation {
            valid: true,
            message: format!("{} token is valid.", name),
        },
        Err(ProviderError::Auth) => TokenValidation::invalid(format!("Invalid {} API token.", name)),
        Err(ProviderError::RateLimited { .. }) => TokenValidation::invalid(format!(
            "{} rate limit reached while validating the token, try again later.",
            name
        )),
        Err(ProviderError::Validation(msg)) | Err(ProviderError::Unexpected(msg)) => {
            TokenValidation::invalid(format!("{} rejected the token: {}", name, msg))
        }
        Err(ProviderError::Unreachable(e)) => {
            tracing::warn!(provider = %provider, error = %e, "Token validation request failed");
            TokenValidation::invalid("Failed to validate token, the provider could not be reached.")
        }
    }
}

/// Resolve a credential for the team and provider or fail with `NotFound`.
pub async fn require_credential(
    store: &dyn CredentialStore,
    team_id: Uuid,
    credential_ref: &str,
    provider: ProviderFamily,
) -> AppResult<ProviderCredential> {
    store
        .lookup(team_id, credential_ref, provider)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} credential not found", provider.display_name())))
}

/// Store a credential after its token passed live validation.
pub async fn create_validated(
    store: &dyn CredentialStore,
    gateways: &dyn GatewayFactory,
    team_id: Uuid,
    provider: ProviderFamily,
    name: &str,
    token: &str,
) -> AppResult<CredentialView> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InputValidation(FieldErrors::single(
            "name",
            "The name field is required.",
        )));
    }

    let validation = validate_token(gateways, provider, token).await;
    if !validation.valid {
        return Err(AppError::InputValidation(FieldErrors::single(
            "token",
            validation.message,
        )));
    }

    let credential = store.create(team_id, provider, name, token.trim()).await?;
    tracing::info!(
        credential_id = %credential.id,
        team_id = %team_id,
        provider = %provider,
        "Stored provider credential"
    );
    Ok(credential.view())
}

/// Postgres-backed [`CredentialStore`] over `cloud_provider_tokens`.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn lookup(
        &self,
        team_id: Uuid,
        credential_ref: &str,
        provider: ProviderFamily,
    ) -> Result<Option<ProviderCredential>, StoreError> {
        let Ok(id) = Uuid::parse_str(credential_ref.trim()) else {
            return Ok(None);
        };

        let credential = sqlx::query_as::<_, ProviderCredential>(
            r#"
            SELECT id, team_id, provider, token, name, created_at, updated_at
            FROM cloud_provider_tokens
            WHERE id = $1 AND team_id = $2 AND provider = $3
            "#,
        )
        .bind(id)
        .bind(team_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    async fn create(
        &self,
        team_id: Uuid,
        provider: ProviderFamily,
        name: &str,
        token: &str,
    ) -> Result<ProviderCredential, StoreError> {
        let credential = sqlx::query_as::<_, ProviderCredential>(
            r#"
            INSERT INTO cloud_provider_tokens (id, team_id, provider, token, name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, team_id, provider, token, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(provider.as_str())
        .bind(token)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(credential)
    }

    async fn rename(
        &self,
        team_id: Uuid,
        id: Uuid,
        name: &str,
    ) -> Result<Option<ProviderCredential>, StoreError> {
        let credential = sqlx::query_as::<_, ProviderCredential>(
            r#"
            UPDATE cloud_provider_tokens
            SET name = $3, updated_at = NOW()
            WHERE id = $1 AND team_id = $2
            RETURNING id, team_id, provider, token, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(team_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let references: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM servers WHERE credential_id = $1 AND team_id = $2",
        )
        .bind(id)
        .bind(team_id)
        .fetch_one(&mut *tx)
        .await?;

        if references > 0 {
            return Err(StoreError::CredentialInUse(references));
        }

        let result = sqlx::query("DELETE FROM cloud_provider_tokens WHERE id = $1 AND team_id = $2")
            .bind(id)
            .bind(team_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_team(&self, team_id: Uuid) -> Result<Vec<CredentialView>, StoreError> {
        let credentials = sqlx::query_as::<_, ProviderCredential>(
            r#"
            SELECT id, team_id, provider, token, name, created_at, updated_at
            FROM cloud_provider_tokens
            WHERE team_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(credentials.iter().map(ProviderCredential::view).collect())
    }
}
