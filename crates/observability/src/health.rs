//! Health-Check-Endpunkt fuer Switchboard
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Bereitschaft des Koordinators

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub koordinator_bereit: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    koordinator_bereit: Arc<AtomicBool>,
}

impl HealthState {
    /// Neuer Zustand; der Koordinator gilt erst nach `bereit_setzen(true)`
    /// als bereit
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            koordinator_bereit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn ist_bereit(&self) -> bool {
        self.koordinator_bereit.load(Ordering::Relaxed)
    }

    pub fn bereit_setzen(&self, bereit: bool) {
        self.koordinator_bereit.store(bereit, Ordering::Relaxed);
    }

    fn antwort(&self) -> (StatusCode, HealthResponse) {
        let bereit = self.ist_bereit();
        let (http_status, status) = if bereit {
            (StatusCode::OK, HealthStatus::Healthy)
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
        };

        (
            http_status,
            HealthResponse {
                status,
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: self.uptime_seconds(),
                koordinator_bereit: bereit,
            },
        )
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let (http_status, response) = state.antwort();
    (http_status, Json(response))
}
