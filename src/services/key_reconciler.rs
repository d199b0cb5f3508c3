//! Ensures a local SSH key exists on the provider account exactly once.

use std::collections::BTreeSet;

use crate::models::LocalKey;
use crate::services::fingerprint;
use crate::services::provider::{ProviderGateway, ProviderResult};

/// Return the remote id of `key` on the gateway's account, uploading it only
/// when no remote key carries the same fingerprint.
///
/// Two concurrent calls for the same key may both upload; the provider then
/// rejects or duplicates the second one.
pub async fn reconcile(gateway: &dyn ProviderGateway, key: &LocalKey) -> ProviderResult<i64> {
    let local = local_fingerprint(key);
    let remote_keys = gateway.list_account_keys().await?;

    if let Some(existing) = remote_keys
        .iter()
        .find(|remote| fingerprint::normalize(&remote.fingerprint) == local)
    {
        tracing::debug!(
            key_id = %key.id,
            remote_id = existing.remote_id,
            provider = %gateway.family(),
            "SSH key already present on provider"
        );
        return Ok(existing.remote_id);
    }

    let remote_id = gateway.upload_key(&key.name, &key.public_key).await?;
    tracing::info!(
        key_id = %key.id,
        remote_id,
        provider = %gateway.family(),
        "Uploaded SSH key to provider"
    );
    Ok(remote_id)
}

/// Stored fingerprint, or one derived from the public key when the stored
/// value is blank.
fn local_fingerprint(key: &LocalKey) -> String {
    let stored = fingerprint::normalize(&key.fingerprint);
    if !stored.is_empty() {
        return stored;
    }
    fingerprint::md5_fingerprint(&key.public_key).unwrap_or(stored)
}

/// Final key id set passed to instance creation: the reconciled id plus any
/// extra ids, without duplicates.
pub fn assemble_key_set(reconciled: i64, extras: &[i64]) -> BTreeSet<i64> {
    std::iter::once(reconciled).chain(extras.iter().copied()).collect()
}
