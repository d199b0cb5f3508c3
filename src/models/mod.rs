//! Data models for the cloudprov-api application.
//!
//! - [`ProviderFamily`] - Supported compute providers
//! - [`ProviderCredential`] - A team's provider API token (never serialized)
//! - [`LocalKey`] - A team's SSH key pair (public half + fingerprint)
//! - [`ManagedServer`] - A provisioned server registered locally
//! - [`ProvisioningRequest`] - Allow-listed create-instance input
//! - catalog types returned by provider gateways

pub mod catalog;
pub mod credential;
pub mod key;
pub mod provider;
pub mod provisioning;
pub mod server;

pub use catalog::{Image, InstancePrice, InstanceType, Location, RemoteKey};
pub use credential::{CredentialView, ProviderCredential};
pub use key::LocalKey;
pub use provider::ProviderFamily;
pub use provisioning::{ImageRef, ProvisionedServerResponse, ProvisioningRequest};
pub use server::{ManagedServer, NewServer, ProxyState, ProxyStatus};
