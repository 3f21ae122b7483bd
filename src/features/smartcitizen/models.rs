use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::shared::traits::Validatable;

/// Response body of `GET /devices/{id}` on the Smart Citizen API.
///
/// Only the fields the collector consumes are modeled; the API sends many
/// more (owner, location, hardware description) that are ignored by serde.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceResponse {
    #[serde(default)]
    pub last_reading_at: Option<String>,
    #[serde(default)]
    pub data: Option<DeviceData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceData {
    #[serde(default)]
    pub sensors: Vec<ApiSensor>,
}

/// One sensor entry as reported by the API. Every field is optional:
/// the firmware omits values for sensors that have not reported yet.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSensor {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub last_reading_at: Option<String>,
}

/// Response body of `GET /devices/{id}/readings`, used by the backfill
/// tool. Each reading is a `[timestamp, value]` pair; value may be null.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalReadings {
    #[serde(default)]
    pub readings: Vec<(String, Option<f64>)>,
}

/// One normalized measurement from one sensor at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub sensor_id: u32,
    pub sensor_name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Validatable for SensorReading {
    fn validate(&self) -> Result<(), String> {
        if self.sensor_name.is_empty() {
            return Err("sensor name cannot be empty".to_string());
        }
        if !self.value.is_finite() {
            return Err(format!(
                "sensor {} reported a non-finite value",
                self.sensor_name
            ));
        }
        Ok(())
    }
}

/// The measurement name used for every point written to InfluxDB.
pub const MEASUREMENT: &str = "sck_sensors";

/// One InfluxDB write point: measurement, tag set, field set, timestamp.
/// Derived deterministically from a [`SensorReading`] plus the device id.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePoint {
    pub device_id: String,
    pub sensor_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl WritePoint {
    pub fn from_reading(reading: &SensorReading, device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            sensor_name: reading.sensor_name.clone(),
            value: reading.value,
            timestamp: reading.timestamp,
        }
    }

    /// Render the point in InfluxDB line protocol with nanosecond precision.
    pub fn to_line_protocol(&self) -> String {
        // timestamp_nanos_opt is None only for dates past 2262; the API
        // reports current wall-clock timestamps.
        let ts_ns = self.timestamp.timestamp_nanos_opt().unwrap_or_default();
        format!(
            "{},device_id={},sensor_name={} value={} {}",
            MEASUREMENT,
            escape_tag_value(&self.device_id),
            escape_tag_value(&self.sensor_name),
            self.value,
            ts_ns,
        )
    }
}

/// Escape the characters the line protocol reserves in tag values.
fn escape_tag_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Join a batch of points into one write-API request body.
pub fn line_protocol_batch(points: &[WritePoint]) -> String {
    points
        .iter()
        .map(WritePoint::to_line_protocol)
        .collect::<Vec<_>>()
        .join("\n")
}
