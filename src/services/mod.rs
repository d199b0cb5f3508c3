//! Services module - business logic and external service integrations.
//!
//! This module contains:
//! - `provider`: Provider gateways (Hetzner, DigitalOcean) and error classification
//! - `credentials`: Provider credential store and live token validation
//! - `keys`: Local SSH key store
//! - `servers`: Managed server registry
//! - `key_reconciler`: Fingerprint-based SSH key dedup against the provider account
//! - `provisioner`: The create-server pipeline
//! - `validator`: Post-create reachability checks
//! - `fingerprint`, `hostname`, `token`: Helpers

pub mod credentials;
pub mod fingerprint;
pub mod hostname;
pub mod key_reconciler;
pub mod keys;
pub mod provider;
pub mod provisioner;
pub mod servers;
pub mod token;
pub mod validator;

// Re-export commonly used types for convenience
pub use credentials::{CredentialStore, PgCredentialStore, TokenValidation};
pub use keys::{KeyStore, PgKeyStore};
pub use provider::{
    GatewayFactory, HttpGatewayFactory, ProviderError, ProviderGateway, ProviderResult,
};
pub use provisioner::Provisioner;
pub use servers::{PgServerRegistry, ServerRegistry};
pub use token::Claims;
pub use validator::{ServerValidator, SshReachabilityValidator};
