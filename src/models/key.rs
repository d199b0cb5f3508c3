//! Local SSH key model.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::fingerprint::{md5_fingerprint, FingerprintError};

/// A team's SSH key pair. Only the public half is needed for provisioning;
/// `fingerprint` is the provider-compatible MD5 fingerprint of `public_key`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LocalKey {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
}

impl LocalKey {
    /// Build a new key record, deriving the fingerprint from `public_key`.
    pub fn new(team_id: Uuid, name: &str, public_key: &str) -> Result<Self, FingerprintError> {
        let public_key = public_key.trim();
        let fingerprint = md5_fingerprint(public_key)?;
        Ok(Self {
            id: Uuid::new_v4(),
            team_id,
            name: name.trim().to_string(),
            public_key: public_key.to_string(),
            fingerprint,
        })
    }
}
