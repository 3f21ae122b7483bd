use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::features::smartcitizen::models::{line_protocol_batch, WritePoint};
use crate::shared::error::StorageError;
use crate::shared::traits::DataStorage;

/// Timeout for one write or health request against InfluxDB.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes batches of points to an InfluxDB 2.x instance over its HTTP API.
pub struct InfluxDbStorage {
    client: Client,
    write_url: Url,
    health_url: Url,
    token: String,
}

/// Response body of the InfluxDB `/health` endpoint.
#[derive(Debug, Deserialize)]
pub struct InfluxHealth {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InfluxDbStorage {
    pub fn new(
        base_url: &str,
        token: &str,
        org: &str,
        bucket: &str,
    ) -> Result<Self, StorageError> {
        let base = Url::parse(base_url)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut write_url = base
            .join("/api/v2/write")
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        write_url
            .query_pairs_mut()
            .append_pair("org", org)
            .append_pair("bucket", bucket)
            .append_pair("precision", "ns");

        let health_url = base
            .join("/health")
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            write_url,
            health_url,
            token: token.to_string(),
        })
    }

    /// Write a batch of points in one line-protocol request.
    ///
    /// The v2 write endpoint accepts or rejects the request as a unit, so a
    /// non-2xx response means no point of the batch was stored.
    pub async fn write_points(&self, points: &[WritePoint]) -> Result<usize, StorageError> {
        if points.is_empty() {
            return Ok(0);
        }

        let body = line_protocol_batch(points);
        let response = self
            .client
            .post(self.write_url.clone())
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("InfluxDB rejected write: status={} body={}", status, detail);
            return Err(StorageError::Write(format!(
                "InfluxDB returned error status {}: {}",
                status, detail
            )));
        }

        debug!("Wrote {} points to InfluxDB", points.len());
        Ok(points.len())
    }

    pub async fn health(&self) -> Result<InfluxHealth, StorageError> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        response
            .json::<InfluxHealth>()
            .await
            .map_err(StorageError::Http)
    }
}

#[async_trait]
impl DataStorage<WritePoint> for InfluxDbStorage {
    async fn batch_store(&self, data: Vec<WritePoint>) -> Result<(), StorageError> {
        self.write_points(&data).await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        matches!(self.health().await, Ok(h) if h.status == "pass")
    }
}
