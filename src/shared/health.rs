//! Healthcheck endpoint served next to the collector loop.
//!
//! Exposes `GET /health` with the number of successful polls and the
//! timestamp of the last one; every other path is a 404.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use serde::Serialize;

/// Counters shared between the collector loop and the health handler.
#[derive(Debug, Default)]
pub struct HealthState {
    polls_total: AtomicU64,
    last_poll: Mutex<Option<DateTime<Utc>>>,
}

impl HealthState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record one successful poll-and-write cycle.
    pub fn record_poll(&self) {
        self.polls_total.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_poll.lock() {
            *guard = Some(Utc::now());
        }
    }

    fn snapshot(&self) -> HealthResponse {
        let last_poll = self
            .last_poll
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true));
        HealthResponse {
            status: "ok",
            polls_total: self.polls_total.load(Ordering::Relaxed),
            last_poll,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    polls_total: u64,
    last_poll: Option<String>,
}

async fn health(State(state): State<Arc<HealthState>>) -> Json<HealthResponse> {
    Json(state.snapshot())
}

pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Bind and serve the healthcheck endpoint until the process exits.
pub async fn serve(port: u16, state: Arc<HealthState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Healthcheck server listening on :{}", port);
    axum::serve(listener, create_router(state)).await
}
