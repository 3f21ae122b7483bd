use std::env;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::shared::error::ConfigError;

const DEFAULT_DEVICE_ID: &str = "19396";
const DEFAULT_API_BASE: &str = "https://api.smartcitizen.me/v0";
const DEFAULT_POLL_INTERVAL_SECONDS: &str = "60";
const DEFAULT_INFLUXDB_URL: &str = "http://influxdb:8086";
const DEFAULT_INFLUXDB_TOKEN: &str = "my-super-secret-token";
const DEFAULT_INFLUXDB_ORG: &str = "sck";
const DEFAULT_INFLUXDB_BUCKET: &str = "sck_data";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HEALTH_PORT: &str = "8000";

/// Sensor id -> normalized name used as the `sensor_name` tag.
/// The numeric id is stable across firmware versions; the display name is not.
pub const SENSOR_NAME_MAP: &[(u32, &str)] = &[
    // Primary environmental sensors
    (55, "temperature"),
    (56, "humidity"),
    (53, "noise_dba"),
    (14, "light"),
    (58, "pressure"),
    // UV
    (214, "uv_a"),
    (215, "uv_b"),
    (216, "uv_c"),
    // Particulate mass
    (193, "pm_1"),
    (194, "pm_2_5"),
    (195, "pm_4"),
    (196, "pm_10"),
    // Particle counts
    (197, "pn_0_5"),
    (198, "pn_1"),
    (199, "pn_2_5"),
    (200, "pn_4"),
    (201, "pn_10"),
    (202, "typical_particle_size"),
    // Diagnostics
    (10, "battery"),
    (220, "wifi_rssi"),
    (221, "sd_card_present"),
];

/// Look up the normalized tag name for a sensor id.
pub fn sensor_name(id: u32) -> Option<&'static str> {
    SENSOR_NAME_MAP
        .iter()
        .find(|(sensor_id, _)| *sensor_id == id)
        .map(|(_, name)| *name)
}

/// Collector configuration, loaded once at startup from environment
/// variables. Every variable has a development default; production values
/// are injected through the container environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub device_id: String,
    pub api_base: String,
    pub poll_interval: Duration,
    pub influxdb_url: String,
    pub influxdb_token: String,
    pub influxdb_org: String,
    pub influxdb_bucket: String,
    pub log_level: String,
    pub health_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base = env_or("SCK_API_BASE", DEFAULT_API_BASE);
        Url::parse(&api_base)?;

        let influxdb_url = env_or("INFLUXDB_URL", DEFAULT_INFLUXDB_URL);
        Url::parse(&influxdb_url)?;

        let poll_interval_secs: u64 = parse_value(
            "POLL_INTERVAL_SECONDS",
            &env_or("POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS),
        )?;
        let health_port: u16 =
            parse_value("HEALTH_PORT", &env_or("HEALTH_PORT", DEFAULT_HEALTH_PORT))?;

        Ok(Self {
            device_id: env_or("SCK_DEVICE_ID", DEFAULT_DEVICE_ID),
            api_base,
            poll_interval: Duration::from_secs(poll_interval_secs),
            influxdb_url,
            influxdb_token: env_or("INFLUXDB_TOKEN", DEFAULT_INFLUXDB_TOKEN),
            influxdb_org: env_or("INFLUXDB_ORG", DEFAULT_INFLUXDB_ORG),
            influxdb_bucket: env_or("INFLUXDB_BUCKET", DEFAULT_INFLUXDB_BUCKET),
            log_level: env_or("LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase(),
            health_port,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_value<T>(variable: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        variable: variable.to_string(),
        message: e.to_string(),
    })
}
