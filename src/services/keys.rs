//! Local SSH key storage.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::LocalKey;

/// Team-scoped access to stored SSH keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// `None` when the reference is malformed, unknown or owned by another team.
    async fn lookup(&self, team_id: Uuid, key_ref: &str) -> Result<Option<LocalKey>, StoreError>;
}

/// Postgres-backed [`KeyStore`] over `private_keys`.
#[derive(Debug, Clone)]
pub struct PgKeyStore {
    pool: PgPool,
}

impl PgKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn lookup(&self, team_id: Uuid, key_ref: &str) -> Result<Option<LocalKey>, StoreError> {
        let Ok(id) = Uuid::parse_str(key_ref.trim()) else {
            return Ok(None);
        };

        let key = sqlx::query_as::<_, LocalKey>(
            r#"
            SELECT id, team_id, name, public_key, fingerprint
            FROM private_keys
            WHERE id = $1 AND team_id = $2
            "#,
        )
        .bind(id)
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }
}
