use crate::models::Catalog;
use crate::services::catalog::{
    parse_colleges, sanitize_colleges, CatalogError, CatalogProvider, SnapshotMemo,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Remote catalog client
///
/// Fetches `GET {base_url}/colleges` and memoizes the parsed snapshot for
/// `refresh`. Concurrent snapshot calls that miss together share one download.
pub struct HttpCatalog {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    snapshots: SnapshotMemo,
}

impl HttpCatalog {
    /// Create a new remote catalog client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        request_timeout: Duration,
        refresh: Duration,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            snapshots: SnapshotMemo::new(refresh),
        })
    }

    fn colleges_url(&self) -> String {
        format!("{}/colleges", self.base_url.trim_end_matches('/'))
    }

    async fn fetch(&self) -> Result<Catalog, CatalogError> {
        let url = self.colleges_url();
        tracing::debug!("Fetching catalog from: {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Catalog fetch failed: {} - {}", status, body);
            return Err(CatalogError::ApiError(format!(
                "Failed to fetch catalog: {}",
                status
            )));
        }

        let json: Value = response.json().await?;
        let colleges = sanitize_colleges(parse_colleges(json)?);

        tracing::info!("Fetched {} colleges from remote catalog", colleges.len());

        Ok(Catalog::new(colleges))
    }

    /// Drop the memoized snapshot so the next call refetches
    pub async fn invalidate(&self) {
        self.snapshots.invalidate().await;
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalog {
    async fn snapshot(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.snapshots.get_or_load(self.fetch()).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
