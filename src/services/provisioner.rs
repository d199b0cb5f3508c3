//! Server provisioning pipeline.
//!
//! One call walks quota check, default resolution, credential and key
//! resolution, key reconciliation, remote creation, IP selection and local
//! registration, in that order. Any failure aborts the remaining steps. Once
//! the remote instance exists nothing is rolled back; later failures are
//! logged with the remote id so the instance can be found by hand.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    ImageRef, NewServer, ProviderFamily, ProvisionedServerResponse, ProvisioningRequest,
};
use crate::services::credentials::{require_credential, CredentialStore};
use crate::services::hostname;
use crate::services::key_reconciler::{assemble_key_set, reconcile};
use crate::services::keys::KeyStore;
use crate::services::provider::{CreateInstanceParams, GatewayFactory, PublicNet};
use crate::services::servers::ServerRegistry;
use crate::services::validator::ServerValidator;

/// Request with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub credential_ref: String,
    pub location: String,
    pub instance_type: String,
    pub image: ImageRef,
    pub name: String,
    pub key_ref: String,
    pub enable_ipv4: bool,
    pub enable_ipv6: bool,
    pub extra_provider_key_ids: Vec<i64>,
    pub cloud_init_script: Option<String>,
    pub validate_after_create: bool,
}

impl From<ProvisioningRequest> for ResolvedRequest {
    fn from(request: ProvisioningRequest) -> Self {
        Self {
            credential_ref: request.credential_ref,
            location: request.location,
            instance_type: request.instance_type,
            image: request.image,
            name: request.name.unwrap_or_else(hostname::generate_name),
            key_ref: request.key_ref,
            enable_ipv4: request.enable_ipv4.unwrap_or(true),
            enable_ipv6: request.enable_ipv6.unwrap_or(true),
            extra_provider_key_ids: request.extra_provider_key_ids.unwrap_or_default(),
            cloud_init_script: request
                .cloud_init_script
                .filter(|script| !script.trim().is_empty()),
            validate_after_create: request.validate_after_create.unwrap_or(false),
        }
    }
}

/// Pick the address the server is registered under: IPv4 when enabled and
/// assigned, otherwise IPv6 under the same conditions.
pub fn select_ip(net: &PublicNet, enable_ipv4: bool, enable_ipv6: bool) -> Option<String> {
    let usable = |ip: &Option<String>| ip.as_deref().filter(|ip| !ip.is_empty()).map(str::to_string);

    if enable_ipv4 {
        if let Some(ip) = usable(&net.ipv4) {
            return Some(ip);
        }
    }
    if enable_ipv6 {
        if let Some(ip) = usable(&net.ipv6) {
            return Some(ip);
        }
    }
    None
}

/// Orchestrates server creation over injected collaborators.
#[derive(Clone)]
pub struct Provisioner {
    credentials: Arc<dyn CredentialStore>,
    keys: Arc<dyn KeyStore>,
    servers: Arc<dyn ServerRegistry>,
    gateways: Arc<dyn GatewayFactory>,
    validator: Arc<dyn ServerValidator>,
    server_limit: Option<u32>,
}

impl Provisioner {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        keys: Arc<dyn KeyStore>,
        servers: Arc<dyn ServerRegistry>,
        gateways: Arc<dyn GatewayFactory>,
        validator: Arc<dyn ServerValidator>,
        server_limit: Option<u32>,
    ) -> Self {
        Self {
            credentials,
            keys,
            servers,
            gateways,
            validator,
            server_limit,
        }
    }

    pub async fn provision(
        &self,
        team_id: Uuid,
        provider: ProviderFamily,
        request: ProvisioningRequest,
    ) -> AppResult<ProvisionedServerResponse> {
        self.check_quota(team_id).await?;

        let request = ResolvedRequest::from(request);

        let credential =
            require_credential(self.credentials.as_ref(), team_id, &request.credential_ref, provider)
                .await?;

        let key = self
            .keys
            .lookup(team_id, &request.key_ref)
            .await?
            .ok_or_else(|| AppError::NotFound("Private key not found".to_string()))?;

        let gateway = self.gateways.gateway(provider, &credential.token);

        let reconciled_key_id = reconcile(gateway.as_ref(), &key).await?;
        let ssh_key_ids = assemble_key_set(reconciled_key_id, &request.extra_provider_key_ids);

        let name = hostname::normalize(&request.name).unwrap_or_else(hostname::generate_name);
        let params = CreateInstanceParams {
            name: name.clone(),
            instance_type: request.instance_type.clone(),
            image: request.image.clone(),
            location: request.location.clone(),
            start_after_create: true,
            ssh_key_ids,
            enable_ipv4: request.enable_ipv4,
            enable_ipv6: request.enable_ipv6,
            user_data: request.cloud_init_script.clone(),
        };

        let created = gateway.create_instance(&params).await?;
        tracing::info!(
            team_id = %team_id,
            provider = %provider,
            remote_instance_id = created.remote_id,
            name = %name,
            "Remote instance created"
        );

        let Some(ip) = select_ip(&created.public_net, request.enable_ipv4, request.enable_ipv6) else {
            tracing::error!(
                team_id = %team_id,
                provider = %provider,
                remote_instance_id = created.remote_id,
                "Remote instance has no usable public IP, not registering it"
            );
            return Err(AppError::ProviderRejected(
                "no usable public IP address was assigned to the new instance".to_string(),
            ));
        };

        let new_server = NewServer {
            team_id,
            name,
            ip,
            credential_id: credential.id,
            private_key_id: key.id,
            remote_instance_id: created.remote_id,
        };

        let server = match self.servers.register(new_server).await {
            Ok(server) => server,
            Err(e) => {
                tracing::error!(
                    team_id = %team_id,
                    provider = %provider,
                    remote_instance_id = created.remote_id,
                    error = %e,
                    "Failed to register created instance, remote instance is orphaned"
                );
                return Err(AppError::Unexpected(
                    "the server was created but could not be registered".to_string(),
                ));
            }
        };

        tracing::info!(
            server_id = %server.id,
            team_id = %team_id,
            ip = %server.ip,
            "Server registered"
        );

        if request.validate_after_create {
            self.validator.enqueue(&server);
        }

        Ok(ProvisionedServerResponse {
            id: server.id,
            remote_instance_id: server.remote_instance_id,
            ip: server.ip,
        })
    }

    async fn check_quota(&self, team_id: Uuid) -> AppResult<()> {
        let Some(limit) = self.server_limit else {
            return Ok(());
        };

        let count = self.servers.count_for_team(team_id).await?;
        if count >= i64::from(limit) {
            tracing::info!(team_id = %team_id, count, limit, "Server limit reached");
            return Err(AppError::InputValidation(FieldErrors::single(
                "server_limit",
                format!("The team has reached its server limit of {}.", limit),
            )));
        }
        Ok(())
    }
}
