//! switchboard-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Raum-Koordinator und Observability zu einem
//! laufenden Prozess.

pub mod config;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use config::ServerConfig;
use switchboard_observability::{
    observability_server_starten, HealthState, RegistryStichprobe, SwitchboardMetrics,
};
use switchboard_signaling::RoomCoordinator;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    koordinator: RoomCoordinator,
}

impl Server {
    /// Erstellt den Server und den Koordinator
    ///
    /// Schlaegt fehl wenn API-Key oder Secret der SFU weder konfiguriert
    /// noch in der Umgebung gesetzt sind.
    pub fn neu(config: ServerConfig) -> Result<Self> {
        let koordinator = RoomCoordinator::aus_umgebung(
            config.koordinator_config(),
            config.livekit.api_key.clone(),
            config.livekit.api_secret.clone(),
            config.livekit.url.clone(),
        )
        .context("Raum-Koordinator konnte nicht erstellt werden")?;

        Ok(Self {
            config,
            koordinator,
        })
    }

    pub fn koordinator(&self) -> &RoomCoordinator {
        &self.koordinator
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Koordinator mit oeffentlicher Adresse starten
    /// 2. Metriken-Stichproben und Raum-Ereignis-Log starten
    /// 3. Observability-Server starten (falls aktiviert)
    /// 4. Auf Ctrl-C warten, dann alle Raeume aufloesen
    pub async fn starten(self) -> Result<()> {
        let signaling = &self.config.signaling;
        self.koordinator.starten(
            signaling.oeffentliche_adresse.clone(),
            signaling.port_min,
            signaling.port_max,
        );

        let metriken = SwitchboardMetrics::neu()?;
        let health = HealthState::neu();

        let mut tasks: Vec<JoinHandle<()>> = vec![
            stichproben_task_starten(
                self.koordinator.clone(),
                metriken.clone(),
                self.config.stichproben_intervall(),
            ),
            ereignis_log_starten(&self.koordinator),
        ];

        if self.config.observability.aktiviert {
            let bind: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Bind-Adresse")?;
            let (m, h) = (metriken.clone(), health.clone());
            tasks.push(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(bind, m, h).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }));
        }

        health.bereit_setzen(true);
        tracing::info!(
            key_id = %self.koordinator.key_id(),
            sfu = %self.koordinator.transport_url(),
            port = self.koordinator.port(),
            "Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)..."
        );

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        health.bereit_setzen(false);

        let ergebnis = self.koordinator.stoppen().await;
        for task in tasks {
            task.abort();
        }
        ergebnis.context("Nicht alle Sessions konnten sauber getrennt werden")?;
        Ok(())
    }
}

/// Nimmt eine Momentaufnahme der Registry-Groessen
pub fn stichprobe_nehmen(koordinator: &RoomCoordinator) -> RegistryStichprobe {
    RegistryStichprobe {
        raeume: koordinator.raum_anzahl(),
        sessions: koordinator.session_anzahl(),
        verbunden: koordinator.verbundene_anzahl(),
    }
}

fn stichproben_task_starten(
    koordinator: RoomCoordinator,
    metriken: SwitchboardMetrics,
    intervall: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut takt = tokio::time::interval(intervall);
        loop {
            takt.tick().await;
            metriken.stichprobe_uebernehmen(stichprobe_nehmen(&koordinator));
        }
    })
}

/// Protokolliert Raum-Ereignisse fuer die Betriebssicht
fn ereignis_log_starten(koordinator: &RoomCoordinator) -> JoinHandle<()> {
    let mut rx = koordinator.ereignisse_abonnieren();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ereignis) => tracing::debug!(
                    room_id = %ereignis.room_id(),
                    ereignis = ?ereignis,
                    "Raum-Ereignis"
                ),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(verpasst = n, "Raum-Ereignis-Log hinkt hinterher");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
