//! Generate synthetic sensor data for local dashboard development.
//!
//! Writes 24 h of plausible readings at 1-minute intervals: diurnal
//! temperature, inversely correlated humidity, day/night noise levels,
//! a light bell curve, PM2.5 with occasional spikes, slow pressure drift
//! and a daytime UV curve. The generator is seeded, so repeated runs
//! produce identical data.

use std::f64::consts::PI;

use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sck_collector::{InfluxDbStorage, WritePoint};

const WRITE_BATCH_SIZE: usize = 5000;

/// Seed InfluxDB with synthetic Smart Citizen readings.
#[derive(Parser, Debug)]
#[command(name = "seed-data", version, about)]
struct Cli {
    #[arg(long, default_value = "http://localhost:8086", env = "INFLUXDB_URL")]
    influxdb_url: String,

    #[arg(long, default_value = "my-super-secret-token", env = "INFLUXDB_TOKEN")]
    token: String,

    #[arg(long, default_value = "sck", env = "INFLUXDB_ORG")]
    org: String,

    #[arg(long, default_value = "sck_data", env = "INFLUXDB_BUCKET")]
    bucket: String,

    #[arg(long, default_value = "19396", env = "SCK_DEVICE_ID")]
    device_id: String,

    /// Hours of history to generate, ending now
    #[arg(long, default_value_t = 24)]
    hours: i64,

    /// Minutes between generated readings
    #[arg(long, default_value_t = 1)]
    interval_minutes: i64,

    /// RNG seed for reproducible data
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let end = Utc::now().duration_trunc(ChronoDuration::minutes(1))?;
    let start = end - ChronoDuration::hours(cli.hours);

    let points = generate_points(start, end, cli.interval_minutes, cli.seed, &cli.device_id);
    println!(
        "Generated {} points for device {} ({} -> {})",
        points.len(),
        cli.device_id,
        start,
        end
    );

    let storage = InfluxDbStorage::new(&cli.influxdb_url, &cli.token, &cli.org, &cli.bucket)?;
    for batch in points.chunks(WRITE_BATCH_SIZE) {
        storage.write_points(batch).await?;
    }

    println!("Seed complete");
    Ok(())
}

/// Generate one batch of synthetic points covering `[start, end]`.
fn generate_points(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval_minutes: i64,
    seed: u64,
    device_id: &str,
) -> Vec<WritePoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    let step = ChronoDuration::minutes(interval_minutes.max(1));

    let mut current = start;
    while current <= end {
        let hour = hour_of_day(&current);
        let day_frac = hour / 24.0;

        // Temperature: sinusoidal 18-28 C, peak mid-afternoon.
        let temperature =
            23.0 + 5.0 * (2.0 * PI * (day_frac - 0.25)).sin() + jitter(&mut rng, 0.3);

        // Humidity: inversely correlated with temperature.
        let humidity =
            (75.0 - 1.5 * (temperature - 18.0) + jitter(&mut rng, 2.0)).clamp(25.0, 85.0);

        // Noise: louder during the day (8-22 h).
        let noise = if (8.0..22.0).contains(&hour) {
            45.0 + jitter(&mut rng, 5.0)
        } else {
            32.0 + jitter(&mut rng, 3.0)
        }
        .clamp(20.0, 80.0);

        // Light and UV: bell curve between 6 h and 20 h, zero at night.
        let daylight = if (6.0..=20.0).contains(&hour) {
            (PI * (hour - 6.0) / 14.0).sin().max(0.0)
        } else {
            0.0
        };
        let light = if daylight > 0.0 {
            (daylight * 1200.0 + jitter(&mut rng, 20.0)).max(0.0)
        } else {
            0.0
        };
        let uv_a = daylight * 3.0;

        // PM2.5: low base with rare spikes.
        let mut pm_2_5 = rng.gen_range(5.0..15.0);
        if rng.gen_bool(0.01) {
            pm_2_5 += rng.gen_range(30.0..80.0);
        }

        // Pressure: slow drift around 101.7 kPa.
        let pressure = 101.7 + 0.6 * (PI * day_frac).sin() + jitter(&mut rng, 0.05);

        for (sensor_name, value) in [
            ("temperature", temperature),
            ("humidity", humidity),
            ("noise_dba", noise),
            ("light", light),
            ("uv_a", uv_a),
            ("pm_2_5", pm_2_5),
            ("pressure", pressure),
        ] {
            points.push(WritePoint {
                device_id: device_id.to_string(),
                sensor_name: sensor_name.to_string(),
                value: (value * 100.0).round() / 100.0,
                timestamp: current,
            });
        }

        current += step;
    }

    points
}

fn hour_of_day(ts: &DateTime<Utc>) -> f64 {
    use chrono::Timelike;
    ts.hour() as f64 + ts.minute() as f64 / 60.0
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    rng.gen_range(-amplitude..=amplitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 2, 4, 0, 0, 0).unwrap();
        (start, start + ChronoDuration::hours(24))
    }

    #[test]
    fn generates_all_sensors_per_step() {
        let (start, end) = window();
        let points = generate_points(start, end, 60, 42, "19396");
        // 25 hourly steps (inclusive range), 7 sensors each.
        assert_eq!(points.len(), 25 * 7);
        assert!(points.iter().all(|p| p.device_id == "19396"));
    }

    #[test]
    fn values_stay_in_plausible_ranges() {
        let (start, end) = window();
        let points = generate_points(start, end, 1, 42, "19396");
        for point in &points {
            match point.sensor_name.as_str() {
                "temperature" => assert!((15.0..=32.0).contains(&point.value)),
                "humidity" => assert!((25.0..=85.0).contains(&point.value)),
                "noise_dba" => assert!((20.0..=80.0).contains(&point.value)),
                "light" | "uv_a" | "pm_2_5" => assert!(point.value >= 0.0),
                "pressure" => assert!((100.0..=103.0).contains(&point.value)),
                other => panic!("unexpected sensor {}", other),
            }
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let (start, end) = window();
        let a = generate_points(start, end, 10, 42, "19396");
        let b = generate_points(start, end, 10, 42, "19396");
        assert_eq!(a, b);

        let c = generate_points(start, end, 10, 43, "19396");
        assert_ne!(a, c);
    }
}
