//! DigitalOcean API client.
//!
//! Implements [`ProviderGateway`] against `https://api.digitalocean.com/v2`.
//! Droplets come back from the create call without networks, so
//! [`DigitalOceanClient::create_instance`] polls the droplet a bounded number
//! of times until a public address is assigned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::http::ApiClient;
use super::{
    CreateInstanceParams, CreatedInstance, ProviderGateway, ProviderResult, PublicNet, MAX_PAGES,
    READ_TIMEOUT,
};
use crate::models::{Image, ImageRef, InstancePrice, InstanceType, Location, ProviderFamily, RemoteKey};

const PER_PAGE: u32 = 100;

/// Droplet lookups after create before giving up on a public address
pub const NETWORK_POLL_ATTEMPTS: u32 = 5;

/// Delay between droplet lookups
pub const NETWORK_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// DigitalOcean API client bound to one personal access token
#[derive(Debug, Clone)]
pub struct DigitalOceanClient {
    api: ApiClient,
    poll_interval: Duration,
}

// Request types

#[derive(Debug, Serialize)]
struct CreateDropletRequest<'a> {
    name: &'a str,
    region: &'a str,
    size: &'a str,
    image: &'a ImageRef,
    ssh_keys: Vec<i64>,
    ipv6: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_data: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateKeyRequest<'a> {
    name: &'a str,
    public_key: &'a str,
}

// Response types

#[derive(Debug, Default, Deserialize)]
struct Links {
    pages: Option<Pages>,
}

#[derive(Debug, Deserialize)]
struct Pages {
    next: Option<String>,
}

/// A paginated DigitalOcean listing envelope.
trait Paged {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

fn next_link(links: Option<Links>) -> Option<String> {
    links.and_then(|l| l.pages).and_then(|p| p.next)
}

#[derive(Debug, Deserialize)]
struct RegionsResponse {
    regions: Vec<DoRegion>,
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct DoRegion {
    slug: String,
    name: String,
    #[serde(default)]
    available: bool,
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    sizes: Vec<DoSize>,
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct DoSize {
    slug: String,
    #[serde(default)]
    description: Option<String>,
    vcpus: u32,
    /// MiB
    memory: u64,
    /// GiB
    disk: u64,
    price_hourly: f64,
    price_monthly: f64,
    #[serde(default)]
    available: bool,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    images: Vec<DoImage>,
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct DoImage {
    id: i64,
    name: Option<String>,
    slug: Option<String>,
    distribution: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    image_type: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    ssh_keys: Vec<DoKey>,
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct DoKey {
    id: i64,
    name: String,
    fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    ssh_key: DoKey,
}

#[derive(Debug, Deserialize)]
struct DropletResponse {
    droplet: DoDroplet,
}

#[derive(Debug, Deserialize)]
struct DoDroplet {
    id: i64,
    #[serde(default)]
    networks: DoNetworks,
}

#[derive(Debug, Default, Deserialize)]
struct DoNetworks {
    #[serde(default)]
    v4: Vec<DoNetwork>,
    #[serde(default)]
    v6: Vec<DoNetwork>,
}

#[derive(Debug, Deserialize)]
struct DoNetwork {
    ip_address: String,
    #[serde(rename = "type")]
    network_type: String,
}

impl Paged for RegionsResponse {
    type Item = DoRegion;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.regions, next_link(self.links))
    }
}

impl Paged for SizesResponse {
    type Item = DoSize;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.sizes, next_link(self.links))
    }
}

impl Paged for ImagesResponse {
    type Item = DoImage;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.images, next_link(self.links))
    }
}

impl Paged for KeysResponse {
    type Item = DoKey;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.ssh_keys, next_link(self.links))
    }
}

impl DoImage {
    fn is_listable(&self) -> bool {
        self.image_type == "base" && self.status.as_deref() == Some("available")
    }
}

impl DoNetworks {
    fn public(list: &[DoNetwork]) -> Option<String> {
        list.iter()
            .find(|n| n.network_type == "public")
            .map(|n| n.ip_address.clone())
    }

    fn public_net(&self) -> PublicNet {
        PublicNet {
            ipv4: Self::public(&self.v4),
            ipv6: Self::public(&self.v6),
        }
    }
}

impl DigitalOceanClient {
    pub fn with_base_url(client: Client, token: String, base_url: String) -> Self {
        Self {
            api: ApiClient::new(client, token, base_url),
            poll_interval: NETWORK_POLL_INTERVAL,
        }
    }

    /// Override the delay between post-create droplet lookups
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Follow `links.pages.next` up to [`MAX_PAGES`] pages. Only links on
    /// the configured API host are followed.
    async fn list_all<P>(&self, path: &str, filters: &[(&str, String)]) -> ProviderResult<Vec<P::Item>>
    where
        P: Paged + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut query = filters.to_vec();
        query.push(("per_page", PER_PAGE.to_string()));

        let mut response: P = self.api.get_list(path, &query).await?;
        let mut pages = 1;

        loop {
            let (mut batch, next) = response.into_parts();
            items.append(&mut batch);

            let Some(next) = next else {
                return Ok(items);
            };
            if !same_origin(self.api.base_url(), &next) {
                tracing::warn!(path = %path, next = %next, "Ignoring pagination link to foreign host");
                return Ok(items);
            }
            if pages >= MAX_PAGES {
                tracing::warn!(path = %path, max_pages = MAX_PAGES, "Pagination cap reached");
                return Ok(items);
            }

            // The link already carries the query string
            response = self.api.get_list(&next, &[]).await?;
            pages += 1;
        }
    }

    /// Poll the droplet until it reports a public address. Lookup failures
    /// are logged and count as an attempt; the droplet already exists.
    async fn wait_for_network(&self, droplet_id: i64) -> PublicNet {
        let path = format!("/droplets/{}", droplet_id);

        for attempt in 1..=NETWORK_POLL_ATTEMPTS {
            tokio::time::sleep(self.poll_interval).await;

            match self.api.get::<DropletResponse>(&path, &[], READ_TIMEOUT).await {
                Ok(response) => {
                    let net = response.droplet.networks.public_net();
                    if net.ipv4.is_some() || net.ipv6.is_some() {
                        return net;
                    }
                    tracing::debug!(droplet_id, attempt, "Droplet has no public network yet");
                }
                Err(e) => {
                    tracing::warn!(droplet_id, attempt, error = %e, "Droplet lookup failed");
                }
            }
        }

        tracing::warn!(
            droplet_id,
            attempts = NETWORK_POLL_ATTEMPTS,
            "Droplet did not report a public network"
        );
        PublicNet::default()
    }
}

#[async_trait]
impl ProviderGateway for DigitalOceanClient {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::DigitalOcean
    }

    async fn verify_token(&self) -> ProviderResult<()> {
        self.api.probe("/account", &[], READ_TIMEOUT).await
    }

    async fn list_locations(&self) -> ProviderResult<Vec<Location>> {
        let regions = self.list_all::<RegionsResponse>("/regions", &[]).await?;
        Ok(regions
            .into_iter()
            .filter(|r| r.available)
            .map(|r| Location {
                name: r.slug,
                description: r.name,
                country: None,
                city: None,
            })
            .collect())
    }

    async fn list_instance_types(&self) -> ProviderResult<Vec<InstanceType>> {
        let sizes = self.list_all::<SizesResponse>("/sizes", &[]).await?;
        Ok(sizes
            .into_iter()
            .filter(|s| s.available)
            .map(|s| InstanceType {
                description: s.description.unwrap_or_else(|| s.slug.clone()),
                name: s.slug,
                cores: s.vcpus,
                memory_gb: s.memory as f64 / 1024.0,
                disk_gb: s.disk,
                prices: vec![InstancePrice {
                    location: None,
                    hourly: format!("{:.5}", s.price_hourly),
                    monthly: format!("{:.2}", s.price_monthly),
                }],
            })
            .collect())
    }

    async fn list_images(&self) -> ProviderResult<Vec<Image>> {
        let filters = [("type", "distribution".to_string())];
        let images = self.list_all::<ImagesResponse>("/images", &filters).await?;

        Ok(images
            .into_iter()
            .filter(DoImage::is_listable)
            .map(|i| Image {
                id: i.id,
                description: i
                    .description
                    .or_else(|| i.name.clone())
                    .unwrap_or_default(),
                os_flavor: i.distribution.map(|d| d.to_lowercase()),
                os_version: i.name.clone(),
                name: i.name,
                slug: i.slug,
                architecture: None,
            })
            .collect())
    }

    async fn list_account_keys(&self) -> ProviderResult<Vec<RemoteKey>> {
        let keys = self.list_all::<KeysResponse>("/account/keys", &[]).await?;
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
        tracing::info!(key_name = %name, "Uploading SSH key to DigitalOcean");
        let response: KeyResponse = self
            .api
            .post("/account/keys", &CreateKeyRequest { name, public_key })
            .await?;
        Ok(response.ssh_key.id)
    }

    async fn create_instance(&self, params: &CreateInstanceParams) -> ProviderResult<CreatedInstance> {
        tracing::info!(
            name = %params.name,
            size = %params.instance_type,
            region = %params.location,
            "Creating DigitalOcean droplet"
        );

        // Droplets always boot and always get IPv4
        let request = CreateDropletRequest {
            name: &params.name,
            region: &params.location,
            size: &params.instance_type,
            image: &params.image,
            ssh_keys: params.ssh_key_ids.iter().copied().collect(),
            ipv6: params.enable_ipv6,
            user_data: params.user_data.as_deref(),
        };

        let response: DropletResponse = self.api.post("/droplets", &request).await?;
        let droplet_id = response.droplet.id;

        let mut public_net = response.droplet.networks.public_net();
        if public_net.ipv4.is_none() && public_net.ipv6.is_none() {
            public_net = self.wait_for_network(droplet_id).await;
        }

        Ok(CreatedInstance {
            remote_id: droplet_id,
            public_net,
        })
    }
}

/// Scheme, host and port of `link` match the configured API base.
fn same_origin(base_url: &str, link: &str) -> bool {
    match (Url::parse(base_url), Url::parse(link)) {
        (Ok(base), Ok(link)) => {
            base.scheme() == link.scheme()
                && base.host_str() == link.host_str()
                && base.port_or_known_default() == link.port_or_known_default()
        }
        _ => false,
    }
}
