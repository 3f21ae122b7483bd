//! Import historical Smart Citizen data into InfluxDB.
//!
//! Iterates over every sensor in the name map, fetches readings for the
//! requested date range via `/devices/{id}/readings`, and writes them in
//! batches. The API is rate-limited, so requests are spaced by a delay.
//!
//! ```text
//! backfill --from 2025-02-01 --to 2025-02-04
//! backfill --from 2025-02-01 --to 2025-02-04 --rollup 5m
//! backfill --influxdb-url http://localhost:8086 --token <TOKEN> --from 2025-01-01 --to 2025-02-01
//! ```

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use sck_collector::features::smartcitizen::collector::parse_timestamp;
use sck_collector::{HistoricalReadings, InfluxDbStorage, WritePoint, SENSOR_NAME_MAP};

/// Maximum number of points per write request.
const WRITE_BATCH_SIZE: usize = 5000;

/// Backfill InfluxDB with historical Smart Citizen data.
#[derive(Parser, Debug)]
#[command(name = "backfill", version, about)]
struct Cli {
    /// Start date (YYYY-MM-DD or ISO 8601, e.g. 2025-02-01)
    #[arg(long = "from")]
    from_date: String,

    /// End date (YYYY-MM-DD or ISO 8601, e.g. 2025-02-04)
    #[arg(long = "to")]
    to_date: String,

    /// Rollup interval
    #[arg(long, default_value = "1m")]
    rollup: String,

    #[arg(long, default_value = "19396", env = "SCK_DEVICE_ID")]
    device_id: String,

    #[arg(long, default_value = "https://api.smartcitizen.me/v0", env = "SCK_API_BASE")]
    api_base: String,

    #[arg(long, default_value = "http://localhost:8086", env = "INFLUXDB_URL")]
    influxdb_url: String,

    #[arg(long, default_value = "my-super-secret-token", env = "INFLUXDB_TOKEN")]
    token: String,

    #[arg(long, default_value = "sck", env = "INFLUXDB_ORG")]
    org: String,

    #[arg(long, default_value = "sck_data", env = "INFLUXDB_BUCKET")]
    bucket: String,

    /// Delay between API requests in seconds
    #[arg(long, default_value_t = 1.0)]
    delay: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let from_date = normalize_date(&cli.from_date, false);
    let to_date = normalize_date(&cli.to_date, true);

    let storage = InfluxDbStorage::new(&cli.influxdb_url, &cli.token, &cli.org, &cli.bucket)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let delay = Duration::from_secs_f64(cli.delay.max(0.0));

    let total_sensors = SENSOR_NAME_MAP.len();
    let mut total_points = 0usize;

    println!(
        "Backfilling device {}: {} -> {} (rollup={})",
        cli.device_id, from_date, to_date, cli.rollup
    );
    println!("Sensors to process: {}\n", total_sensors);

    for (index, (sensor_id, sensor_name)) in SENSOR_NAME_MAP.iter().enumerate() {
        print!(
            "[{}/{}] Fetching sensor {} ({})... ",
            index + 1,
            total_sensors,
            sensor_id,
            sensor_name
        );
        std::io::stdout().flush().ok();

        let history = match fetch_readings(
            &client,
            &cli.api_base,
            &cli.device_id,
            *sensor_id,
            &cli.rollup,
            &from_date,
            &to_date,
        )
        .await
        {
            Ok(history) => history,
            Err(e) => {
                println!("ERROR: {}", e);
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let points = points_from_history(&history.readings, &cli.device_id, sensor_name);
        if points.is_empty() {
            println!("no data");
            tokio::time::sleep(delay).await;
            continue;
        }

        for batch in points.chunks(WRITE_BATCH_SIZE) {
            storage.write_points(batch).await?;
        }

        total_points += points.len();
        println!("{} points written", points.len());

        tokio::time::sleep(delay).await;
    }

    println!("\nBackfill complete: {} total points written", total_points);
    Ok(())
}

async fn fetch_readings(
    client: &reqwest::Client,
    api_base: &str,
    device_id: &str,
    sensor_id: u32,
    rollup: &str,
    from_date: &str,
    to_date: &str,
) -> Result<HistoricalReadings, reqwest::Error> {
    let url = format!(
        "{}/devices/{}/readings",
        api_base.trim_end_matches('/'),
        device_id
    );
    client
        .get(url)
        .query(&[
            ("sensor_id", sensor_id.to_string().as_str()),
            ("rollup", rollup),
            ("from", from_date),
            ("to", to_date),
            ("function", "avg"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json::<HistoricalReadings>()
        .await
}

/// Expand a plain date to a full ISO 8601 timestamp for the API.
fn normalize_date(date: &str, end_of_day: bool) -> String {
    if date.contains('T') {
        return date.to_string();
    }
    if end_of_day {
        format!("{}T23:59:59Z", date)
    } else {
        format!("{}T00:00:00Z", date)
    }
}

/// Convert `[timestamp, value]` pairs to write points, dropping null values
/// and unparseable timestamps.
fn points_from_history(
    readings: &[(String, Option<f64>)],
    device_id: &str,
    sensor_name: &str,
) -> Vec<WritePoint> {
    readings
        .iter()
        .filter_map(|(raw_ts, value)| {
            let value = (*value)?;
            let timestamp = parse_timestamp(raw_ts)?;
            Some(WritePoint {
                device_id: device_id.to_string(),
                sensor_name: sensor_name.to_string(),
                value,
                timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_date_expands_plain_dates() {
        assert_eq!(normalize_date("2025-02-01", false), "2025-02-01T00:00:00Z");
        assert_eq!(normalize_date("2025-02-01", true), "2025-02-01T23:59:59Z");
        assert_eq!(
            normalize_date("2025-02-01T12:00:00Z", true),
            "2025-02-01T12:00:00Z"
        );
    }

    #[test]
    fn history_points_skip_nulls_and_bad_timestamps() {
        let readings = vec![
            ("2025-02-01T00:00:00Z".to_string(), Some(21.5)),
            ("2025-02-01T00:01:00Z".to_string(), None),
            ("garbage".to_string(), Some(1.0)),
            ("2025-02-01T00:02:00Z".to_string(), Some(22.0)),
        ];
        let points = points_from_history(&readings, "19396", "temperature");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 21.5);
        assert_eq!(points[1].value, 22.0);
        assert!(points
            .iter()
            .all(|p| p.device_id == "19396" && p.sensor_name == "temperature"));
    }
}
