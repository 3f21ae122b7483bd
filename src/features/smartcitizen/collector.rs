use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::Client;
use url::Url;

use crate::features::smartcitizen::models::{DeviceResponse, SensorReading};
use crate::shared::config::sensor_name;
use crate::shared::error::CollectionError;
use crate::shared::traits::{AsyncDataCollector, Validatable};

/// Timeout for one API request. The tick is skipped if the API is slower.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap for the backoff between consecutive failed ticks (5 minutes).
const MAX_BACKOFF_SECONDS: u64 = 300;

/// Result of one poll cycle against the device endpoint.
#[derive(Debug)]
pub enum PollOutcome {
    /// New readings to be written, plus the device-level reading timestamp
    /// to remember once the write succeeds.
    Fresh {
        reading_at: Option<DateTime<Utc>>,
        readings: Vec<SensorReading>,
    },
    /// The device reported the same `last_reading_at` as the previous
    /// successful poll; nothing to write.
    Duplicate,
    /// The response parsed but contained no usable readings.
    Empty,
}

/// Polls the Smart Citizen API for one fixed device.
pub struct SmartCitizenCollector {
    client: Client,
    device_url: String,
    last_reading_at: Option<DateTime<Utc>>,
}

impl SmartCitizenCollector {
    pub fn new(api_base: &str, device_id: &str) -> Result<Self, CollectionError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let device_url = format!("{}/devices/{}", api_base.trim_end_matches('/'), device_id);
        Ok(Self {
            client,
            device_url,
            last_reading_at: None,
        })
    }

    pub async fn fetch_device(&self) -> Result<DeviceResponse, CollectionError> {
        let response = self.client.get(&self.device_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectionError::ApiStatus(status.as_u16()));
        }
        response
            .json::<DeviceResponse>()
            .await
            .map_err(|e| CollectionError::Parse(e.to_string()))
    }

    /// Execute one fetch-and-extract cycle. Does not write anywhere; the
    /// caller decides what to do with the outcome.
    pub async fn poll(&mut self) -> Result<PollOutcome, CollectionError> {
        let data = self.fetch_device().await?;
        let reading_at = data.last_reading_at.as_deref().and_then(parse_timestamp);

        if is_duplicate(self.last_reading_at, reading_at) {
            info!(
                "Skipping duplicate reading (timestamp={:?})",
                data.last_reading_at
            );
            return Ok(PollOutcome::Duplicate);
        }

        let readings = extract_readings(&data);
        if readings.is_empty() {
            return Ok(PollOutcome::Empty);
        }

        Ok(PollOutcome::Fresh {
            reading_at,
            readings,
        })
    }

    /// Advance the duplicate-detection cursor. Called only after the
    /// readings from the poll were written, so a failed write leaves the
    /// cursor untouched and the next fresh poll rewrites idempotently.
    pub fn mark_written(&mut self, reading_at: Option<DateTime<Utc>>) {
        if reading_at.is_some() {
            self.last_reading_at = reading_at;
        }
    }

    fn internal_validate(&self) -> Result<(), CollectionError> {
        Url::parse(&self.device_url)
            .map(|_| ())
            .map_err(|e| CollectionError::Parse(format!("invalid device URL: {}", e)))
    }
}

#[async_trait]
impl AsyncDataCollector<PollOutcome> for SmartCitizenCollector {
    async fn collect(&mut self) -> Result<PollOutcome, CollectionError> {
        self.poll().await
    }

    async fn validate(&self) -> Result<(), CollectionError> {
        self.internal_validate()
    }

    async fn health_check(&self) -> bool {
        self.internal_validate().is_ok()
    }
}

/// Extract the mapped sensor readings from a device response.
///
/// Sensors outside the name map, sensors with null values, and sensors with
/// no resolvable timestamp are skipped. The per-sensor timestamp falls back
/// to the device-level one.
pub fn extract_readings(data: &DeviceResponse) -> Vec<SensorReading> {
    let sensors = data
        .data
        .as_ref()
        .map(|d| d.sensors.as_slice())
        .unwrap_or_default();

    let mut readings = Vec::new();
    for sensor in sensors {
        let Some(id) = sensor.id else { continue };
        let Some(name) = sensor_name(id) else { continue };
        let Some(value) = sensor.value else { continue };

        let Some(raw_timestamp) = sensor
            .last_reading_at
            .as_deref()
            .or(data.last_reading_at.as_deref())
        else {
            continue;
        };
        let Some(timestamp) = parse_timestamp(raw_timestamp) else {
            warn!(
                "Skipping sensor {}: unparseable timestamp {:?}",
                name, raw_timestamp
            );
            continue;
        };

        let reading = SensorReading {
            sensor_id: id,
            sensor_name: name.to_string(),
            value,
            unit: sensor.unit.clone(),
            timestamp,
        };
        if let Err(reason) = reading.validate() {
            warn!("Skipping sensor {}: {}", name, reason);
            continue;
        }
        readings.push(reading);
    }

    readings
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn is_duplicate(last: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    current.is_some() && current == last
}

/// Delay before the next tick after `consecutive_errors` failed ticks:
/// 2^n seconds, capped at 5 minutes.
pub fn backoff_delay(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.min(16);
    Duration::from_secs((1u64 << exponent).min(MAX_BACKOFF_SECONDS))
}
