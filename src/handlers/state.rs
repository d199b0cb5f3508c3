//! Shared application state handed to every handler.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::provisioner::Provisioner;
use crate::services::{
    CredentialStore, GatewayFactory, HttpGatewayFactory, KeyStore, PgCredentialStore, PgKeyStore,
    PgServerRegistry, ServerRegistry, ServerValidator, SshReachabilityValidator,
};

/// Application state shared across handlers.
///
/// Collaborators are trait objects so tests can swap in in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub keys: Arc<dyn KeyStore>,
    pub servers: Arc<dyn ServerRegistry>,
    pub gateways: Arc<dyn GatewayFactory>,
    pub validator: Arc<dyn ServerValidator>,
}

impl AppState {
    /// Production wiring: Postgres stores and HTTP provider gateways.
    pub fn new(config: Config, pool: PgPool, http_client: reqwest::Client) -> Self {
        let gateways = HttpGatewayFactory::new(
            http_client,
            config.hetzner_api_base.clone(),
            config.digitalocean_api_base.clone(),
        );
        let validator = SshReachabilityValidator::new(config.validate_probe_attempts);

        Self {
            credentials: Arc::new(PgCredentialStore::new(pool.clone())),
            keys: Arc::new(PgKeyStore::new(pool.clone())),
            servers: Arc::new(PgServerRegistry::new(pool)),
            gateways: Arc::new(gateways),
            validator: Arc::new(validator),
            config,
        }
    }

    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(
            self.credentials.clone(),
            self.keys.clone(),
            self.servers.clone(),
            self.gateways.clone(),
            self.validator.clone(),
            self.config.team_server_limit,
        )
    }
}
