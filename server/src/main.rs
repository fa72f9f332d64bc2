//! Switchboard Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use switchboard_observability::logging_initialisieren;
use switchboard_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("SWITCHBOARD_CONFIG")
        .unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ServerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Switchboard wird initialisiert"
    );

    // Fehlende SFU-Zugangsdaten brechen hier ab
    let server = Server::neu(config)?;
    server.starten().await?;

    Ok(())
}
