//! Provider catalog types, normalized across providers.

use serde::Serialize;

/// A location/region instances can be created in
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Location {
    /// Identifier passed back on create (e.g. "nbg1", "fra1")
    pub name: String,
    pub description: String,
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Price of an instance type, optionally per location
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstancePrice {
    pub location: Option<String>,
    pub hourly: String,
    pub monthly: String,
}

/// A purchasable instance type ("server type", "size")
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstanceType {
    pub name: String,
    pub description: String,
    pub cores: u32,
    pub memory_gb: f64,
    pub disk_gb: u64,
    pub prices: Vec<InstancePrice>,
}

/// A bootable system image
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Image {
    pub id: i64,
    pub name: Option<String>,
    pub description: String,
    pub slug: Option<String>,
    pub os_flavor: Option<String>,
    pub os_version: Option<String>,
    pub architecture: Option<String>,
}

/// An SSH key registered on the provider account (never persisted locally)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemoteKey {
    pub remote_id: i64,
    pub fingerprint: String,
    pub name: String,
}
