//! Compute provider abstraction.
//!
//! Each supported provider implements [`ProviderGateway`]; callers obtain one
//! through a [`GatewayFactory`] and never branch on the provider name
//! themselves.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Image, ImageRef, InstanceType, Location, ProviderFamily, RemoteKey};

pub mod classify;
pub mod digitalocean;
pub mod hetzner;
mod http;

pub use digitalocean::DigitalOceanClient;
pub use hetzner::HetznerClient;

pub const HETZNER_API_BASE: &str = "https://api.hetzner.cloud/v1";
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

/// Timeout for single-resource reads such as token verification
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for list and create calls
pub const LIST_TIMEOUT: Duration = Duration::from_secs(20);

/// Total attempts for list calls hitting transient transport failures
pub const LIST_ATTEMPTS: u32 = 3;

/// Hard cap on followed pagination links
pub const MAX_PAGES: u32 = 10;

/// Classified provider failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The credential token was rejected
    #[error("Provider rejected the credential")]
    Auth,

    /// The provider rejected the request body
    #[error("Provider validation failed: {0}")]
    Validation(String),

    /// Rate limited; optional retry hint in seconds
    #[error("Provider rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    /// Timeout or connection failure
    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    /// Anything else
    #[error("Provider request failed: {0}")]
    Unexpected(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Parameters for creating an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstanceParams {
    pub name: String,
    pub instance_type: String,
    pub image: ImageRef,
    pub location: String,
    pub start_after_create: bool,
    pub ssh_key_ids: BTreeSet<i64>,
    pub enable_ipv4: bool,
    pub enable_ipv6: bool,
    pub user_data: Option<String>,
}

/// Public addresses reported for a new instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicNet {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

/// Result of a successful create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInstance {
    pub remote_id: i64,
    pub public_net: PublicNet,
}

/// Uniform capability interface over a provider account.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    fn family(&self) -> ProviderFamily;

    /// One bounded authenticated read; `Ok(())` means the token is accepted.
    async fn verify_token(&self) -> ProviderResult<()>;

    async fn list_locations(&self) -> ProviderResult<Vec<Location>>;

    async fn list_instance_types(&self) -> ProviderResult<Vec<InstanceType>>;

    /// System images only, deprecated ones removed.
    async fn list_images(&self) -> ProviderResult<Vec<Image>>;

    async fn list_account_keys(&self) -> ProviderResult<Vec<RemoteKey>>;

    /// Upload a public key; returns the remote key id.
    async fn upload_key(&self, name: &str, public_key: &str) -> ProviderResult<i64>;

    async fn create_instance(&self, params: &CreateInstanceParams) -> ProviderResult<CreatedInstance>;
}

/// Builds a gateway bound to one credential token.
pub trait GatewayFactory: Send + Sync {
    fn gateway(&self, family: ProviderFamily, token: &str) -> Arc<dyn ProviderGateway>;
}

/// Production factory creating HTTP clients against the real provider APIs.
#[derive(Debug, Clone)]
pub struct HttpGatewayFactory {
    client: reqwest::Client,
    hetzner_base: String,
    digitalocean_base: String,
}

impl HttpGatewayFactory {
    pub fn new(
        client: reqwest::Client,
        hetzner_base: impl Into<String>,
        digitalocean_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            hetzner_base: hetzner_base.into(),
            digitalocean_base: digitalocean_base.into(),
        }
    }
}

impl GatewayFactory for HttpGatewayFactory {
    fn gateway(&self, family: ProviderFamily, token: &str) -> Arc<dyn ProviderGateway> {
        match family {
            ProviderFamily::Hetzner => Arc::new(HetznerClient::with_base_url(
                self.client.clone(),
                token.to_string(),
                self.hetzner_base.clone(),
            )),
            ProviderFamily::DigitalOcean => Arc::new(DigitalOceanClient::with_base_url(
                self.client.clone(),
                token.to_string(),
                self.digitalocean_base.clone(),
            )),
        }
    }
}
