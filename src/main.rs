use std::sync::Arc;
use std::time::Duration;

use env_logger::Env;
use log::{debug, error, info, warn};
use sck_collector::{
    features::smartcitizen::collector::backoff_delay,
    shared::{config::Config, health},
    AsyncDataCollector, DataStorage, HealthState, InfluxDbStorage, PollOutcome,
    SmartCitizenCollector, WritePoint,
};
use tokio::sync::watch;
use tokio::time::{self, Interval, MissedTickBehavior};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(&config.log_level)).init();

    info!(
        "Collector starting - device={}, interval={}s, influx={}",
        config.device_id,
        config.poll_interval.as_secs(),
        config.influxdb_url
    );

    let storage = match InfluxDbStorage::new(
        &config.influxdb_url,
        &config.influxdb_token,
        &config.influxdb_org,
        &config.influxdb_bucket,
    ) {
        Ok(storage) => storage,
        Err(e) => {
            error!("Failed to initialize InfluxDB storage: {}", e);
            return;
        }
    };

    // Verify connectivity once before entering the loop; a failure here is
    // not fatal, the loop keeps retrying.
    match storage.health().await {
        Ok(h) if h.status == "pass" => info!(
            "InfluxDB connection OK (version={})",
            h.version.as_deref().unwrap_or("unknown")
        ),
        Ok(h) => warn!(
            "InfluxDB health check: {}",
            h.message.as_deref().unwrap_or(&h.status)
        ),
        Err(e) => warn!("Cannot reach InfluxDB - will retry in the loop: {}", e),
    }

    let mut collector = match SmartCitizenCollector::new(&config.api_base, &config.device_id) {
        Ok(collector) => collector,
        Err(e) => {
            error!("Failed to initialize Smart Citizen collector: {}", e);
            return;
        }
    };

    let health_state = HealthState::new();
    {
        let state = Arc::clone(&health_state);
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = health::serve(port, state).await {
                error!("Healthcheck server failed: {}", e);
            }
        });
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut interval = time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_errors: u32 = 0;
    let mut backoff: Option<Duration> = None;

    loop {
        tokio::select! {
            _ = wait_for_next(&mut interval, backoff.take()) => {}
            _ = shutdown_rx.changed() => break,
        }

        match AsyncDataCollector::collect(&mut collector).await {
            Ok(PollOutcome::Fresh {
                reading_at,
                readings,
            }) => {
                let points: Vec<WritePoint> = readings
                    .iter()
                    .map(|r| WritePoint::from_reading(r, &config.device_id))
                    .collect();
                let count = points.len();

                match storage.batch_store(points).await {
                    Ok(()) => {
                        collector.mark_written(reading_at);
                        health_state.record_poll();
                        consecutive_errors = 0;
                        info!("Written {} points (reading_at={:?})", count, reading_at);
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        let wait = backoff_delay(consecutive_errors);
                        error!(
                            "Failed to store readings in InfluxDB (attempt {}, backoff {}s): {}",
                            consecutive_errors,
                            wait.as_secs(),
                            e
                        );
                        backoff = Some(wait);
                    }
                }
            }
            Ok(PollOutcome::Duplicate) => {
                consecutive_errors = 0;
                debug!("No new device reading since last poll");
            }
            Ok(PollOutcome::Empty) => {
                consecutive_errors = 0;
                warn!("No valid sensor readings in API response");
            }
            Err(e) => {
                consecutive_errors += 1;
                let wait = backoff_delay(consecutive_errors);
                error!(
                    "API request failed (attempt {}, backoff {}s): {}",
                    consecutive_errors,
                    wait.as_secs(),
                    e
                );
                backoff = Some(wait);
            }
        }
    }

    info!("Shutdown complete");
}

/// Wait before the next poll attempt: the backoff delay after a failed
/// tick, otherwise the regular interval tick. A backoff sleep replaces the
/// interval wait and restarts the interval, so a 2 s backoff retries after
/// 2 s even with a 60 s poll interval.
async fn wait_for_next(interval: &mut Interval, backoff: Option<Duration>) {
    match backoff {
        Some(delay) => {
            time::sleep(delay).await;
            interval.reset();
        }
        None => {
            interval.tick().await;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT - initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM - initiating graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn poll_interval() -> Interval {
        let mut interval = time::interval(Duration::from_secs(60));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_preempts_the_interval_wait() {
        let mut interval = poll_interval();
        interval.tick().await; // first tick completes immediately

        let start = Instant::now();
        wait_for_next(&mut interval, Some(Duration::from_secs(2))).await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_restarts_after_a_backoff_resume() {
        let mut interval = poll_interval();
        interval.tick().await;

        wait_for_next(&mut interval, Some(Duration::from_secs(2))).await;

        // The next regular wait is a full period from the retry, not the
        // leftover of the original schedule.
        let start = Instant::now();
        wait_for_next(&mut interval, None).await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn regular_ticks_are_spaced_by_the_period() {
        let mut interval = poll_interval();
        wait_for_next(&mut interval, None).await; // immediate first tick

        let start = Instant::now();
        wait_for_next(&mut interval, None).await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }
}
