//! Shared bearer-authenticated JSON transport for provider clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::classify::{classify_response, classify_transport, is_transient};
use super::{ProviderResult, LIST_ATTEMPTS, LIST_TIMEOUT};

const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub(crate) struct ApiClient {
    client: Client,
    token: String,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ApiClient {
    pub(crate) fn new(client: Client, token: String, base_url: String) -> Self {
        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Paths are relative to the base URL; absolute URLs (pagination links)
    /// are used as-is.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Single GET attempt with the given timeout.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> ProviderResult<T> {
        let request = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .timeout(timeout);
        let response = send(request).await?;
        parse(response).await
    }

    /// GET for list-style calls: retries connect/timeout failures a fixed
    /// number of times. HTTP error statuses are returned immediately.
    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let mut attempt = 1;
        loop {
            let request = self
                .client
                .get(self.url(path))
                .bearer_auth(&self.token)
                .query(query)
                .timeout(LIST_TIMEOUT);

            match request.send().await {
                Ok(response) => return parse(response).await,
                Err(e) if is_transient(&e) && attempt < LIST_ATTEMPTS => {
                    tracing::warn!(
                        path = %path,
                        attempt,
                        error = %e,
                        "Transient provider failure, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(classify_transport(&e)),
            }
        }
    }

    /// POST without retries (create/upload are not idempotent).
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ProviderResult<T> {
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .timeout(LIST_TIMEOUT);
        let response = send(request).await?;
        parse(response).await
    }

    /// Single authenticated GET that only checks the status.
    pub(crate) async fn probe(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> ProviderResult<()> {
        let request = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .timeout(timeout);
        let response = send(request).await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from(response).await)
    }
}

async fn send(request: RequestBuilder) -> ProviderResult<Response> {
    request.send().await.map_err(|e| classify_transport(&e))
}

async fn error_from(response: Response) -> super::ProviderError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, body = %body, "Provider returned error response");
    classify_response(status, &headers, &body)
}

async fn parse<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let body = response.bytes().await.map_err(|e| classify_transport(&e))?;
    serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse provider response: {}", e);
        super::ProviderError::Unexpected(format!("invalid response from provider: {}", e))
    })
}
