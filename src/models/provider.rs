//! Provider family enumeration.

use serde::{Deserialize, Serialize};

/// Compute provider a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    Hetzner,
    DigitalOcean,
}

impl ProviderFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::Hetzner => "hetzner",
            ProviderFamily::DigitalOcean => "digitalocean",
        }
    }

    /// Parse a path segment or stored column value. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hetzner" => Some(ProviderFamily::Hetzner),
            "digitalocean" => Some(ProviderFamily::DigitalOcean),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderFamily::Hetzner => "Hetzner Cloud",
            ProviderFamily::DigitalOcean => "DigitalOcean",
        }
    }
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
