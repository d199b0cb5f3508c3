//! Hetzner Cloud API client.
//!
//! Implements [`ProviderGateway`] against `https://api.hetzner.cloud/v1`.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::http::ApiClient;
use super::{
    CreateInstanceParams, CreatedInstance, ProviderGateway, ProviderResult, PublicNet, MAX_PAGES,
    READ_TIMEOUT,
};
use crate::models::{Image, ImageRef, InstancePrice, InstanceType, Location, ProviderFamily, RemoteKey};

const PER_PAGE: u32 = 50;

/// Hetzner Cloud API client bound to one project token
#[derive(Debug, Clone)]
pub struct HetznerClient {
    api: ApiClient,
}

// Request types

#[derive(Debug, Serialize)]
struct CreateServerRequest<'a> {
    name: &'a str,
    server_type: &'a str,
    image: &'a ImageRef,
    location: &'a str,
    start_after_create: bool,
    ssh_keys: Vec<i64>,
    public_net: PublicNetRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PublicNetRequest {
    enable_ipv4: bool,
    enable_ipv6: bool,
}

#[derive(Debug, Serialize)]
struct CreateSshKeyRequest<'a> {
    name: &'a str,
    public_key: &'a str,
}

// Response types

#[derive(Debug, Deserialize)]
struct Meta {
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    next_page: Option<u32>,
}

/// A paginated Hetzner listing envelope.
trait Paged {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<u32>);
}

fn next_page(meta: Option<Meta>) -> Option<u32> {
    meta.and_then(|m| m.pagination).and_then(|p| p.next_page)
}

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    locations: Vec<HetznerLocation>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct HetznerLocation {
    name: String,
    description: String,
    country: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerTypesResponse {
    server_types: Vec<HetznerServerType>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct HetznerServerType {
    name: String,
    description: String,
    cores: u32,
    memory: f64,
    disk: u64,
    #[serde(default)]
    prices: Vec<HetznerPrice>,
}

#[derive(Debug, Deserialize)]
struct HetznerPrice {
    location: String,
    price_hourly: PriceAmount,
    price_monthly: PriceAmount,
}

#[derive(Debug, Deserialize)]
struct PriceAmount {
    gross: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    images: Vec<HetznerImage>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct HetznerImage {
    id: i64,
    #[serde(rename = "type")]
    image_type: String,
    name: Option<String>,
    description: String,
    os_flavor: Option<String>,
    os_version: Option<String>,
    architecture: Option<String>,
    /// ISO timestamp once deprecated, `null` otherwise
    deprecated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SshKeysResponse {
    ssh_keys: Vec<HetznerSshKey>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct HetznerSshKey {
    id: i64,
    name: String,
    fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct SshKeyResponse {
    ssh_key: HetznerSshKey,
}

#[derive(Debug, Deserialize)]
struct CreateServerResponse {
    server: HetznerServer,
}

#[derive(Debug, Deserialize)]
struct HetznerServer {
    id: i64,
    public_net: HetznerPublicNet,
}

#[derive(Debug, Deserialize)]
struct HetznerPublicNet {
    ipv4: Option<IpEntry>,
    ipv6: Option<IpEntry>,
}

#[derive(Debug, Deserialize)]
struct IpEntry {
    ip: String,
}

impl Paged for LocationsResponse {
    type Item = HetznerLocation;
    fn into_parts(self) -> (Vec<Self::Item>, Option<u32>) {
        (self.locations, next_page(self.meta))
    }
}

impl Paged for ServerTypesResponse {
    type Item = HetznerServerType;
    fn into_parts(self) -> (Vec<Self::Item>, Option<u32>) {
        (self.server_types, next_page(self.meta))
    }
}

impl Paged for ImagesResponse {
    type Item = HetznerImage;
    fn into_parts(self) -> (Vec<Self::Item>, Option<u32>) {
        (self.images, next_page(self.meta))
    }
}

impl Paged for SshKeysResponse {
    type Item = HetznerSshKey;
    fn into_parts(self) -> (Vec<Self::Item>, Option<u32>) {
        (self.ssh_keys, next_page(self.meta))
    }
}

impl HetznerImage {
    fn is_listable(&self) -> bool {
        self.image_type == "system" && self.deprecated.is_none()
    }
}

/// Hetzner reports the instance's IPv6 `/64` network; the host takes `::1`.
fn ipv6_host_address(network: &str) -> String {
    let address = network.split('/').next().unwrap_or(network);
    if address.ends_with("::") {
        format!("{}1", address)
    } else {
        address.to_string()
    }
}

impl HetznerClient {
    pub fn with_base_url(client: Client, token: String, base_url: String) -> Self {
        Self {
            api: ApiClient::new(client, token, base_url),
        }
    }

    /// Follow `meta.pagination.next_page` up to [`MAX_PAGES`] pages.
    async fn list_all<P>(&self, path: &str, filters: &[(&str, String)]) -> ProviderResult<Vec<P::Item>>
    where
        P: Paged + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page = 1;

        for _ in 0..MAX_PAGES {
            let mut query = filters.to_vec();
            query.push(("page", page.to_string()));
            query.push(("per_page", PER_PAGE.to_string()));

            let response: P = self.api.get_list(path, &query).await?;
            let (mut batch, next) = response.into_parts();
            items.append(&mut batch);

            match next {
                Some(next) => page = next,
                None => return Ok(items),
            }
        }

        tracing::warn!(path = %path, max_pages = MAX_PAGES, "Pagination cap reached");
        Ok(items)
    }
}

#[async_trait]
impl ProviderGateway for HetznerClient {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Hetzner
    }

    async fn verify_token(&self) -> ProviderResult<()> {
        self.api
            .probe("/servers", &[("per_page", "1".to_string())], READ_TIMEOUT)
            .await
    }

    async fn list_locations(&self) -> ProviderResult<Vec<Location>> {
        let locations = self.list_all::<LocationsResponse>("/locations", &[]).await?;
        Ok(locations
            .into_iter()
            .map(|l| Location {
                name: l.name,
                description: l.description,
                country: l.country,
                city: l.city,
            })
            .collect())
    }

    async fn list_instance_types(&self) -> ProviderResult<Vec<InstanceType>> {
        let types = self.list_all::<ServerTypesResponse>("/server_types", &[]).await?;
        Ok(types
            .into_iter()
            .map(|t| InstanceType {
                name: t.name,
                description: t.description,
                cores: t.cores,
                memory_gb: t.memory,
                disk_gb: t.disk,
                prices: t
                    .prices
                    .into_iter()
                    .map(|p| InstancePrice {
                        location: Some(p.location),
                        hourly: p.price_hourly.gross,
                        monthly: p.price_monthly.gross,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn list_images(&self) -> ProviderResult<Vec<Image>> {
        let filters = [
            ("type", "system".to_string()),
            ("status", "available".to_string()),
            ("include_deprecated", "false".to_string()),
        ];
        let images = self.list_all::<ImagesResponse>("/images", &filters).await?;

        // The query filters are advisory; enforce them on the result as well.
        Ok(images
            .into_iter()
            .filter(HetznerImage::is_listable)
            .map(|i| Image {
                id: i.id,
                name: i.name,
                description: i.description,
                slug: None,
                os_flavor: i.os_flavor,
                os_version: i.os_version,
                architecture: i.architecture,
            })
            .collect())
    }

    async fn list_account_keys(&self) -> ProviderResult<Vec<RemoteKey>> {
        let keys = self.list_all::<SshKeysResponse>("/ssh_keys", &[]).await?;
        Ok(keys
            .into_iter()
            .map(|k| RemoteKey {
                remote_id: k.id,
                fingerprint: k.fingerprint,
                name: k.name,
            })
            .collect())
    }

    async fn upload_key(&self, name: &str, public_key: &str) -> ProviderResult<i64> {
        tracing::info!(key_name = %name, "Uploading SSH key to Hetzner");
        let response: SshKeyResponse = self
            .api
            .post("/ssh_keys", &CreateSshKeyRequest { name, public_key })
            .await?;
        Ok(response.ssh_key.id)
    }

    async fn create_instance(&self, params: &CreateInstanceParams) -> ProviderResult<CreatedInstance> {
        tracing::info!(
            name = %params.name,
            server_type = %params.instance_type,
            location = %params.location,
            "Creating Hetzner server"
        );

        let request = CreateServerRequest {
            name: &params.name,
            server_type: &params.instance_type,
            image: &params.image,
            location: &params.location,
            start_after_create: params.start_after_create,
            ssh_keys: params.ssh_key_ids.iter().copied().collect(),
            public_net: PublicNetRequest {
                enable_ipv4: params.enable_ipv4,
                enable_ipv6: params.enable_ipv6,
            },
            user_data: params.user_data.as_deref(),
        };

        let response: CreateServerResponse = self.api.post("/servers", &request).await?;
        let net = response.server.public_net;

        Ok(CreatedInstance {
            remote_id: response.server.id,
            public_net: PublicNet {
                ipv4: net.ipv4.map(|e| e.ip),
                ipv6: net.ipv6.map(|e| ipv6_host_address(&e.ip)),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv6_host_address() {
        assert_eq!(ipv6_host_address("2a01:4f8:c17:b8f::/64"), "2a01:4f8:c17:b8f::1");
        assert_eq!(ipv6_host_address("2a01:4f8:c17:b8f::5"), "2a01:4f8:c17:b8f::5");
    }

    #[test]
    fn test_image_listable_filter() {
        let image = |image_type: &str, deprecated: Option<&str>| HetznerImage {
            id: 1,
            image_type: image_type.to_string(),
            name: Some("ubuntu-24.04".to_string()),
            description: "Ubuntu 24.04".to_string(),
            os_flavor: Some("ubuntu".to_string()),
            os_version: Some("24.04".to_string()),
            architecture: Some("x86".to_string()),
            deprecated: deprecated.map(str::to_string),
        };

        assert!(image("system", None).is_listable());
        assert!(!image("snapshot", None).is_listable());
        assert!(!image("backup", None).is_listable());
        assert!(!image("system", Some("2024-01-01T00:00:00+00:00")).is_listable());
    }

    #[test]
    fn test_create_request_serialization() {
        let image = ImageRef::Id(15512617);
        let request = CreateServerRequest {
            name: "swift-otter-abc123",
            server_type: "cx11",
            image: &image,
            location: "nbg1",
            start_after_create: true,
            ssh_keys: vec![1, 2],
            public_net: PublicNetRequest {
                enable_ipv4: true,
                enable_ipv6: false,
            },
            user_data: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["image"], 15512617);
        assert_eq!(json["start_after_create"], true);
        assert_eq!(json["public_net"]["enable_ipv6"], false);
        assert!(json.get("user_data").is_none());
    }
}
