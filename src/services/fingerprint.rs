//! SSH public key fingerprints.
//!
//! Hetzner and DigitalOcean both identify account keys by the MD5 digest of
//! the decoded key blob, rendered as colon-separated lowercase hex. Computing
//! the same value locally lets key reconciliation compare strings directly.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use md5::{Digest, Md5};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("Public key is empty")]
    Empty,

    #[error("Public key is missing the base64 key blob")]
    MissingBlob,

    #[error("Unsupported key type: {0}")]
    UnsupportedType(String),

    #[error("Key blob is not valid base64")]
    InvalidBase64,
}

const SUPPORTED_PREFIXES: &[&str] = &["ssh-", "ecdsa-sha2-", "sk-"];

/// MD5 fingerprint of an OpenSSH `authorized_keys` style public key line.
///
/// ```
/// use cloudprov_api::services::fingerprint::md5_fingerprint;
///
/// let fp = md5_fingerprint(
///     "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIPRPdCZppBakB3dD/8YjsPB+vT0AocRtEbeqt58y7dWt deploy",
/// )
/// .unwrap();
/// assert_eq!(fp, "17:1e:fc:94:c4:7e:e6:fc:29:8a:d5:cb:6e:29:7f:ee");
/// ```
pub fn md5_fingerprint(public_key: &str) -> Result<String, FingerprintError> {
    let mut parts = public_key.split_whitespace();

    let key_type = parts.next().ok_or(FingerprintError::Empty)?;
    if !SUPPORTED_PREFIXES.iter().any(|p| key_type.starts_with(p)) {
        return Err(FingerprintError::UnsupportedType(key_type.to_string()));
    }

    let blob = parts.next().ok_or(FingerprintError::MissingBlob)?;
    let decoded = BASE64_STANDARD
        .decode(blob)
        .map_err(|_| FingerprintError::InvalidBase64)?;

    let digest = Md5::digest(&decoded);
    Ok(digest
        .iter()
        .map(|byte| hex::encode([*byte]))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Normalize a provider-reported fingerprint for comparison.
pub fn normalize(fingerprint: &str) -> String {
    fingerprint
        .trim()
        .trim_start_matches("MD5:")
        .to_ascii_lowercase()
}
