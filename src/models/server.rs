//! Managed server model - a provisioned instance registered locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Default SSH login for freshly provisioned images
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: i32 = 22;

/// Reverse-proxy lifecycle status on a managed server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStatus {
    Running,
    Exited,
}

/// Proxy state stored as JSON alongside the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyState {
    pub status: ProxyStatus,
    pub force_stop: bool,
}

impl ProxyState {
    /// Preset for new servers: proxy stopped until explicitly activated.
    pub fn disabled() -> Self {
        Self {
            status: ProxyStatus::Exited,
            force_stop: true,
        }
    }
}

/// Managed server from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ManagedServer {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub ip: String,
    pub ssh_user: String,
    pub ssh_port: i32,
    pub credential_id: Uuid,
    pub private_key_id: Uuid,
    pub remote_instance_id: i64,
    pub proxy_state: Json<ProxyState>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to register a server.
#[derive(Debug, Clone)]
pub struct NewServer {
    pub team_id: Uuid,
    pub name: String,
    pub ip: String,
    pub credential_id: Uuid,
    pub private_key_id: Uuid,
    pub remote_instance_id: i64,
}

impl NewServer {
    /// Materialize the record with a fresh id and the default SSH/proxy presets.
    pub fn into_server(self) -> ManagedServer {
        ManagedServer {
            id: Uuid::new_v4(),
            team_id: self.team_id,
            name: self.name,
            ip: self.ip,
            ssh_user: DEFAULT_SSH_USER.to_string(),
            ssh_port: DEFAULT_SSH_PORT,
            credential_id: self.credential_id,
            private_key_id: self.private_key_id,
            remote_instance_id: self.remote_instance_id,
            proxy_state: Json(ProxyState::disabled()),
            created_at: Utc::now(),
        }
    }
}
