//! Maps provider HTTP failures onto [`ProviderError`].
//!
//! Every gateway call funnels its non-2xx responses and transport errors
//! through here, so catalog listing and provisioning see the same taxonomy.

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;

use super::ProviderError;

/// Hetzner: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct NestedErrorBody {
    error: NestedError,
}

#[derive(Debug, Deserialize)]
struct NestedError {
    message: Option<String>,
    code: Option<String>,
}

/// DigitalOcean: `{"id": "...", "message": "..."}`
#[derive(Debug, Deserialize)]
struct FlatErrorBody {
    message: Option<String>,
    id: Option<String>,
}

/// Classify a non-success HTTP response.
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let message = extract_message(status, body);

    match status.as_u16() {
        401 | 403 => ProviderError::Auth,
        400 | 409 | 412 | 422 => ProviderError::Validation(message),
        429 => ProviderError::RateLimited {
            retry_after: retry_after(headers),
        },
        _ => ProviderError::Unexpected(message),
    }
}

/// Classify a transport-level failure (no HTTP response, or unreadable body).
pub fn classify_transport(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Unreachable(err.to_string())
    } else {
        ProviderError::Unexpected(err.to_string())
    }
}

/// Whether a transport failure is worth retrying on idempotent reads.
pub fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Best-effort extraction of the provider's own message text.
pub fn extract_message(status: StatusCode, body: &str) -> String {
    if let Ok(nested) = serde_json::from_str::<NestedErrorBody>(body) {
        if let Some(message) = nested.error.message.or(nested.error.code) {
            return message;
        }
    }

    if let Ok(flat) = serde_json::from_str::<FlatErrorBody>(body) {
        if let Some(message) = flat.message.or(flat.id) {
            return message;
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}

/// Retry hint in seconds: `Retry-After` first, then the epoch-based
/// `RateLimit-Reset` both providers send.
fn retry_after(headers: &HeaderMap) -> Option<u64> {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    if let Some(seconds) = header_str("retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Some(seconds);
    }

    header_str("ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .map(|reset| (reset - Utc::now().timestamp()).max(0) as u64)
}
