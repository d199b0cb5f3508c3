//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use cloudprov_api::config::Config;
use cloudprov_api::error::StoreError;
use cloudprov_api::handlers::AppState;
use cloudprov_api::models::{
    CredentialView, Image, InstanceType, LocalKey, Location, ManagedServer, NewServer,
    ProviderCredential, ProviderFamily, RemoteKey,
};
use cloudprov_api::services::credentials::CredentialStore;
use cloudprov_api::services::keys::KeyStore;
use cloudprov_api::services::provider::{
    CreateInstanceParams, CreatedInstance, GatewayFactory, ProviderError, ProviderGateway,
    ProviderResult, PublicNet,
};
use cloudprov_api::services::provisioner::Provisioner;
use cloudprov_api::services::servers::ServerRegistry;
use cloudprov_api::services::token::create_access_token;
use cloudprov_api::services::validator::ServerValidator;

pub const JWT_SECRET: &str = "integration-test-secret";

pub const PUBLIC_KEY: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIPRPdCZppBakB3dD/8YjsPB+vT0AocRtEbeqt58y7dWt deploy";
pub const PUBLIC_KEY_FINGERPRINT: &str = "17:1e:fc:94:c4:7e:e6:fc:29:8a:d5:cb:6e:29:7f:ee";

pub fn test_config(server_limit: Option<u32>) -> Config {
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        team_server_limit: server_limit,
        hetzner_api_base: "http://127.0.0.1:1".to_string(),
        digitalocean_api_base: "http://127.0.0.1:1".to_string(),
        validate_probe_attempts: 1,
    }
}

pub fn bearer(team_id: Uuid) -> String {
    let token = create_access_token(Uuid::new_v4(), team_id, JWT_SECRET, 3600).unwrap();
    format!("Bearer {}", token)
}

// ============================================================================
// Provider gateway
// ============================================================================

/// Scriptable gateway that counts every call it receives.
pub struct FakeGateway {
    family: ProviderFamily,
    pub remote_keys: Mutex<Vec<RemoteKey>>,
    next_key_id: Mutex<i64>,
    pub create_result: Mutex<ProviderResult<CreatedInstance>>,
    pub create_params: Mutex<Vec<CreateInstanceParams>>,
    pub verify_result: Mutex<ProviderResult<()>>,
    pub catalog_error: Mutex<Option<ProviderError>>,
    pub list_keys_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub other_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new(family: ProviderFamily) -> Self {
        Self {
            family,
            remote_keys: Mutex::new(Vec::new()),
            next_key_id: Mutex::new(1000),
            create_result: Mutex::new(Ok(CreatedInstance {
                remote_id: 4711,
                public_net: PublicNet {
                    ipv4: Some("203.0.113.10".to_string()),
                    ipv6: Some("2001:db8::1".to_string()),
                },
            })),
            create_params: Mutex::new(Vec::new()),
            verify_result: Mutex::new(Ok(())),
            catalog_error: Mutex::new(None),
            list_keys_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            other_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_remote_key(self, remote_id: i64, fingerprint: &str) -> Self {
        self.remote_keys.lock().unwrap().push(RemoteKey {
            remote_id,
            fingerprint: fingerprint.to_string(),
            name: format!("key-{}", remote_id),
        });
        self
    }

    pub fn set_create_result(&self, result: ProviderResult<CreatedInstance>) {
        *self.create_result.lock().unwrap() = result;
    }

    pub fn total_calls(&self) -> usize {
        self.list_keys_calls.load(Ordering::SeqCst)
            + self.upload_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.other_calls.load(Ordering::SeqCst)
    }

    pub fn last_create_params(&self) -> Option<CreateInstanceParams> {
        self.create_params.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    fn family(&self) -> ProviderFamily {
        self.family
    }

    async fn verify_token(&self) -> ProviderResult<()> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        self.verify_result.lock().unwrap().clone()
    }

    async fn list_locations(&self) -> ProviderResult<Vec<Location>> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.catalog_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(vec![Location {
            name: "nbg1".to_string(),
            description: "Nuremberg DC Park 1".to_string(),
            country: Some("DE".to_string()),
            city: Some("Nuremberg".to_string()),
        }])
    }

    async fn list_instance_types(&self) -> ProviderResult<Vec<InstanceType>> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn list_images(&self) -> ProviderResult<Vec<Image>> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn list_account_keys(&self) -> ProviderResult<Vec<RemoteKey>> {
        self.list_keys_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote_keys.lock().unwrap().clone())
    }

    async fn upload_key(&self, name: &str, public_key: &str) -> ProviderResult<i64> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let mut next = self.next_key_id.lock().unwrap();
        *next += 1;
        let remote_id = *next;

        let fingerprint = cloudprov_api::services::fingerprint::md5_fingerprint(public_key)
            .map_err(|e| ProviderError::Validation(e.to_string()))?;
        self.remote_keys.lock().unwrap().push(RemoteKey {
            remote_id,
            fingerprint,
            name: name.to_string(),
        });
        Ok(remote_id)
    }

    async fn create_instance(&self, params: &CreateInstanceParams) -> ProviderResult<CreatedInstance> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_params.lock().unwrap().push(params.clone());
        self.create_result.lock().unwrap().clone()
    }
}

/// Hands out the same fake gateway for every token and records the tokens.
pub struct FakeGatewayFactory {
    pub gateway: Arc<FakeGateway>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeGatewayFactory {
    pub fn new(gateway: Arc<FakeGateway>) -> Self {
        Self {
            gateway,
            tokens: Mutex::new(Vec::new()),
        }
    }
}

impl GatewayFactory for FakeGatewayFactory {
    fn gateway(&self, _family: ProviderFamily, token: &str) -> Arc<dyn ProviderGateway> {
        self.tokens.lock().unwrap().push(token.to_string());
        self.gateway.clone()
    }
}

// ============================================================================
// Stores
// ============================================================================

/// Credential store whose delete guard consults the shared server registry.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    pub credentials: Mutex<Vec<ProviderCredential>>,
    servers: Arc<InMemoryServerRegistry>,
}

impl InMemoryCredentialStore {
    pub fn backed_by(servers: Arc<InMemoryServerRegistry>) -> Self {
        Self {
            credentials: Mutex::new(Vec::new()),
            servers,
        }
    }

    pub fn seed(&self, team_id: Uuid, provider: ProviderFamily, token: &str) -> ProviderCredential {
        let credential = ProviderCredential {
            id: Uuid::new_v4(),
            team_id,
            provider: provider.as_str().to_string(),
            token: token.to_string(),
            name: "default".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.credentials.lock().unwrap().push(credential.clone());
        credential
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(
        &self,
        team_id: Uuid,
        credential_ref: &str,
        provider: ProviderFamily,
    ) -> Result<Option<ProviderCredential>, StoreError> {
        let Ok(id) = Uuid::parse_str(credential_ref) else {
            return Ok(None);
        };
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id && c.team_id == team_id && c.provider == provider.as_str())
            .cloned())
    }

    async fn create(
        &self,
        team_id: Uuid,
        provider: ProviderFamily,
        name: &str,
        token: &str,
    ) -> Result<ProviderCredential, StoreError> {
        let mut credential = self.seed(team_id, provider, token);
        credential.name = name.to_string();
        let mut credentials = self.credentials.lock().unwrap();
        if let Some(stored) = credentials.iter_mut().find(|c| c.id == credential.id) {
            stored.name = name.to_string();
        }
        Ok(credential)
    }

    async fn rename(
        &self,
        team_id: Uuid,
        id: Uuid,
        name: &str,
    ) -> Result<Option<ProviderCredential>, StoreError> {
        let mut credentials = self.credentials.lock().unwrap();
        Ok(credentials
            .iter_mut()
            .find(|c| c.id == id && c.team_id == team_id)
            .map(|c| {
                c.name = name.to_string();
                c.clone()
            }))
    }

    async fn delete(&self, team_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let references = self
            .servers
            .servers
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.credential_id == id && s.team_id == team_id)
            .count() as i64;
        if references > 0 {
            return Err(StoreError::CredentialInUse(references));
        }

        let mut credentials = self.credentials.lock().unwrap();
        let before = credentials.len();
        credentials.retain(|c| !(c.id == id && c.team_id == team_id));
        Ok(credentials.len() < before)
    }

    async fn list_for_team(&self, team_id: Uuid) -> Result<Vec<CredentialView>, StoreError> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.team_id == team_id)
            .map(ProviderCredential::view)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryKeyStore {
    pub keys: Mutex<Vec<LocalKey>>,
}

impl InMemoryKeyStore {
    pub fn seed(&self, team_id: Uuid) -> LocalKey {
        let key = LocalKey::new(team_id, "deploy", PUBLIC_KEY).unwrap();
        self.keys.lock().unwrap().push(key.clone());
        key
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn lookup(&self, team_id: Uuid, key_ref: &str) -> Result<Option<LocalKey>, StoreError> {
        let Ok(id) = Uuid::parse_str(key_ref) else {
            return Ok(None);
        };
        Ok(self
            .keys
            .lock()
            .unwrap()
            .iter()
            .find(|k| k.id == id && k.team_id == team_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryServerRegistry {
    pub servers: Mutex<Vec<ManagedServer>>,
    pub fail_register: std::sync::atomic::AtomicBool,
}

impl InMemoryServerRegistry {
    pub fn len(&self) -> usize {
        self.servers.lock().unwrap().len()
    }

    pub fn seed(&self, team_id: Uuid, count: usize) {
        for i in 0..count {
            let server = NewServer {
                team_id,
                name: format!("existing-{}", i),
                ip: format!("198.51.100.{}", i + 1),
                credential_id: Uuid::new_v4(),
                private_key_id: Uuid::new_v4(),
                remote_instance_id: i as i64,
            }
            .into_server();
            self.servers.lock().unwrap().push(server);
        }
    }
}

#[async_trait]
impl ServerRegistry for InMemoryServerRegistry {
    async fn count_for_team(&self, team_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .servers
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.team_id == team_id)
            .count() as i64)
    }

    async fn register(&self, server: NewServer) -> Result<ManagedServer, StoreError> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("registry offline".to_string()));
        }
        let server = server.into_server();
        self.servers.lock().unwrap().push(server.clone());
        Ok(server)
    }
}

#[derive(Default)]
pub struct RecordingValidator {
    pub enqueued: Mutex<Vec<Uuid>>,
}

impl ServerValidator for RecordingValidator {
    fn enqueue(&self, server: &ManagedServer) {
        self.enqueued.lock().unwrap().push(server.id);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A team with one credential and one key, wired to a fake gateway.
pub struct Harness {
    pub team_id: Uuid,
    pub credential: ProviderCredential,
    pub key: LocalKey,
    pub gateway: Arc<FakeGateway>,
    pub factory: Arc<FakeGatewayFactory>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub keys: Arc<InMemoryKeyStore>,
    pub servers: Arc<InMemoryServerRegistry>,
    pub validator: Arc<RecordingValidator>,
    pub server_limit: Option<u32>,
}

impl Harness {
    pub fn new(family: ProviderFamily) -> Self {
        Self::with_gateway(FakeGateway::new(family), family)
    }

    pub fn with_gateway(gateway: FakeGateway, family: ProviderFamily) -> Self {
        let team_id = Uuid::new_v4();
        let servers = Arc::new(InMemoryServerRegistry::default());
        let credentials = Arc::new(InMemoryCredentialStore::backed_by(servers.clone()));
        let keys = Arc::new(InMemoryKeyStore::default());
        let credential = credentials.seed(team_id, family, "provider-token");
        let key = keys.seed(team_id);
        let gateway = Arc::new(gateway);

        Self {
            team_id,
            credential,
            key,
            factory: Arc::new(FakeGatewayFactory::new(gateway.clone())),
            gateway,
            credentials,
            keys,
            servers,
            validator: Arc::new(RecordingValidator::default()),
            server_limit: None,
        }
    }

    pub fn with_server_limit(mut self, limit: u32) -> Self {
        self.server_limit = Some(limit);
        self
    }

    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(
            self.credentials.clone(),
            self.keys.clone(),
            self.servers.clone(),
            self.factory.clone(),
            self.validator.clone(),
            self.server_limit,
        )
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            config: test_config(self.server_limit),
            credentials: self.credentials.clone(),
            keys: self.keys.clone(),
            servers: self.servers.clone(),
            gateways: self.factory.clone(),
            validator: self.validator.clone(),
        }
    }

    /// Minimal valid create-server body for this harness.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "credential_ref": self.credential.id.to_string(),
            "location": "nbg1",
            "instance_type": "cx11",
            "image": 15512617,
            "key_ref": self.key.id.to_string(),
        })
    }
}
