//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `SWB_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder
//!   `switchboard_signaling=debug`), Standard aus der Konfiguration
//! - `SWB_LOG_FORMAT`: Format (text/json), Standard aus der Konfiguration

use tracing_subscriber::{EnvFilter, fmt};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "SWB_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "SWB_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor `level` und `format`. Ein
/// ungueltiger Filter faellt auf `info` zurueck.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
///
/// Akzeptiert ein einfaches Level oder eine kommagetrennte Liste von
/// Direktiven der Form `ziel=level`.
pub fn log_level_gueltig(level: &str) -> bool {
    !level.is_empty()
        && level.split(',').all(|direktive| {
            let level = match direktive.split_once('=') {
                Some((ziel, level)) if !ziel.is_empty() => level,
                Some(_) => return false,
                None => direktive,
            };
            matches!(level, "trace" | "debug" | "info" | "warn" | "error")
        })
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
