//! REST client for a remote configuration store.
//!
//! # Routes
//! ```text
//! GET    /api/configurations/applications/{app}/active
//! GET    /api/configurations/{id}
//! POST   /api/configurations
//! PUT    /api/configurations/{id}
//! DELETE /api/configurations/{id}
//! GET    /health
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::model::ConfigEntry;
use crate::settings::StoreSettings;
use crate::store::{ConfigStore, StoreError, StoreResult};

/// Store client speaking JSON over HTTP.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    /// Create a client for the store described by `settings`.
    pub fn new(settings: &StoreSettings) -> StoreResult<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| StoreError::InvalidUrl {
            url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl {
                url: settings.base_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn unexpected(status: StatusCode, url: &Url) -> StoreError {
        StoreError::Status {
            status: status.as_u16(),
            path: url.path().to_string(),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ConfigStore for HttpStore {
    async fn fetch_active_entries(&self, application: &str) -> StoreResult<Vec<ConfigEntry>> {
        let url = self.endpoint(&["api", "configurations", "applications", application, "active"]);
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response.status(), &url));
        }

        let entries: Vec<ConfigEntry> = Self::decode(response).await?;
        Ok(entries.into_iter().filter(|e| e.active).collect())
    }

    async fn fetch_by_id(&self, id: &str) -> StoreResult<Option<ConfigEntry>> {
        let url = self.endpoint(&["api", "configurations", id]);
        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(Self::decode(response).await?)),
            s => Err(Self::unexpected(s, &url)),
        }
    }

    async fn insert(&self, entry: ConfigEntry) -> StoreResult<ConfigEntry> {
        let url = self.endpoint(&["api", "configurations"]);
        let response = self.client.post(url.clone()).json(&entry).send().await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response.status(), &url));
        }
        Self::decode(response).await
    }

    async fn update(&self, id: &str, entry: ConfigEntry) -> StoreResult<bool> {
        let url = self.endpoint(&["api", "configurations", id]);
        let response = self.client.put(url.clone()).json(&entry).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(Self::unexpected(s, &url)),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let url = self.endpoint(&["api", "configurations", id]);
        let response = self.client.delete(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(Self::unexpected(s, &url)),
        }
    }

    async fn health_check(&self) -> bool {
        let url = self.endpoint(&["health"]);
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}
