//! Prometheus-kompatible Metriken fuer Switchboard
//!
//! Registrierte Metriken:
//! - `switchboard_rooms_active` – Gauge: Raeume in der Registry
//! - `switchboard_sessions_active` – Gauge: Sessions ueber alle Raeume
//! - `switchboard_sessions_connected` – Gauge: Sessions mit stehender SFU-Verbindung
//!
//! Die Werte werden periodisch aus einer Momentaufnahme der Registry
//! uebernommen, nicht bei jeder Operation gezaehlt.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Momentaufnahme der Registry-Groessen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStichprobe {
    pub raeume: usize,
    pub sessions: usize,
    pub verbunden: usize,
}

/// Alle Switchboard-Prometheus-Metriken
#[derive(Clone)]
pub struct SwitchboardMetrics {
    pub registry: Arc<Registry>,
    pub raeume_aktiv: IntGauge,
    pub sessions_aktiv: IntGauge,
    pub sessions_verbunden: IntGauge,
}

impl SwitchboardMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let raeume_aktiv = IntGauge::with_opts(Opts::new(
            "switchboard_rooms_active",
            "Anzahl aktiver Raeume",
        ))?;
        registry.register(Box::new(raeume_aktiv.clone()))?;

        let sessions_aktiv = IntGauge::with_opts(Opts::new(
            "switchboard_sessions_active",
            "Anzahl Sessions ueber alle Raeume",
        ))?;
        registry.register(Box::new(sessions_aktiv.clone()))?;

        let sessions_verbunden = IntGauge::with_opts(Opts::new(
            "switchboard_sessions_connected",
            "Anzahl Sessions mit stehender SFU-Verbindung",
        ))?;
        registry.register(Box::new(sessions_verbunden.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            raeume_aktiv,
            sessions_aktiv,
            sessions_verbunden,
        })
    }

    /// Uebernimmt eine Momentaufnahme in die Gauges
    pub fn stichprobe_uebernehmen(&self, stichprobe: RegistryStichprobe) {
        self.raeume_aktiv.set(gauge_wert(stichprobe.raeume));
        self.sessions_aktiv.set(gauge_wert(stichprobe.sessions));
        self.sessions_verbunden.set(gauge_wert(stichprobe.verbunden));
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn gauge_wert(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: SwitchboardMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<SwitchboardMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
