//! Durable registry of managed servers.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ManagedServer, NewServer};

#[async_trait]
pub trait ServerRegistry: Send + Sync {
    /// Number of servers currently registered for the team.
    async fn count_for_team(&self, team_id: Uuid) -> Result<i64, StoreError>;

    /// Persist a server. Called once per successfully created remote instance.
    async fn register(&self, server: NewServer) -> Result<ManagedServer, StoreError>;
}

/// Postgres-backed [`ServerRegistry`] over `servers`.
#[derive(Debug, Clone)]
pub struct PgServerRegistry {
    pool: PgPool,
}

impl PgServerRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServerRegistry for PgServerRegistry {
    async fn count_for_team(&self, team_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM servers WHERE team_id = $1")
            .bind(team_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn register(&self, server: NewServer) -> Result<ManagedServer, StoreError> {
        let server = server.into_server();

        let stored = sqlx::query_as::<_, ManagedServer>(
            r#"
            INSERT INTO servers (
                id, team_id, name, ip, ssh_user, ssh_port, credential_id,
                private_key_id, remote_instance_id, proxy_state, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, team_id, name, ip, ssh_user, ssh_port, credential_id,
                      private_key_id, remote_instance_id, proxy_state, created_at
            "#,
        )
        .bind(server.id)
        .bind(server.team_id)
        .bind(&server.name)
        .bind(&server.ip)
        .bind(&server.ssh_user)
        .bind(server.ssh_port)
        .bind(server.credential_id)
        .bind(server.private_key_id)
        .bind(server.remote_instance_id)
        .bind(&server.proxy_state)
        .bind(server.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }
}
