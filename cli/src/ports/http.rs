//! HTTP adapter for the node daemon API
//!
//! One client covers all three daemon surfaces: the replicated feed,
//! content-addressed blob storage, and the peer listing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::errors::RegistryError;
use crate::ports::{BlobStore, Feed, FeedPage, PeerDirectory, PeerInfo};

/// Client for the local node daemon.
pub struct NodeApiClient {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl NodeApiClient {
    /// Create a new client against `base_url`, e.g. `http://localhost:5080/v0`.
    pub fn new(base_url: &str, api_token: Option<SecretString>) -> Result<Self, RegistryError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| RegistryError::ConfigError(format!("Invalid node API URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistryError::ConfigError(format!(
                "Node API URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RegistryError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.api_token {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }
        request
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RegistryError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Node API request failed: {} - {}", status, body);
            return Err(RegistryError::StorageUnavailable(format!(
                "{}: {}",
                status, body
            )));
        }
        Ok(response)
    }

    async fn send(request: RequestBuilder) -> Result<reqwest::Response, RegistryError> {
        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;
        Self::check(response).await
    }
}

#[derive(Deserialize)]
struct AppendResponse {
    seq: u64,
}

#[derive(Deserialize)]
struct EntryDto {
    seq: u64,
    value: Value,
}

#[derive(Deserialize)]
struct PageResponse {
    entries: Vec<EntryDto>,
    next: Option<u64>,
}

#[derive(Deserialize)]
struct PutBlobResponse {
    cid: String,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: HashMap<String, PeerInfo>,
}

#[async_trait]
impl Feed for NodeApiClient {
    async fn append(&self, feed: &str, value: Value) -> Result<u64, RegistryError> {
        let request = self
            .request(Method::POST, &format!("/feeds/{}/entries", feed))
            .json(&value);
        let response = Self::send(request).await?;
        let body: AppendResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;
        Ok(body.seq)
    }

    async fn read_page(
        &self,
        feed: &str,
        offset: u64,
        limit: usize,
    ) -> Result<FeedPage, RegistryError> {
        let request = self
            .request(Method::GET, &format!("/feeds/{}/entries", feed))
            .query(&[("offset", offset.to_string()), ("limit", limit.to_string())]);
        let response = Self::send(request).await?;
        let body: PageResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;

        Ok(FeedPage {
            entries: body.entries.into_iter().map(|e| (e.seq, e.value)).collect(),
            next: body.next,
        })
    }
}

#[async_trait]
impl BlobStore for NodeApiClient {
    async fn put(&self, bytes: &[u8]) -> Result<String, RegistryError> {
        let request = self
            .request(Method::POST, "/blobs")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec());
        let response = Self::send(request).await?;
        let body: PutBlobResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;
        Ok(body.cid)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, RegistryError> {
        let request = self.request(Method::GET, &format!("/blobs/{}", cid));
        let response = Self::send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PeerDirectory for NodeApiClient {
    async fn connected_peers(&self) -> Result<HashMap<String, PeerInfo>, RegistryError> {
        let request = self.request(Method::GET, "/peers");
        let response = Self::send(request).await?;
        let body: PeersResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::StorageUnavailable(e.to_string()))?;
        Ok(body.peers)
    }
}
