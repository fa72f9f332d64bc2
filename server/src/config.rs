//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Fehlende SFU-Zugangsdaten werden aus der Umgebung
//! (`LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`, `LIVEKIT_URL`) ergaenzt.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchboard_observability::{log_format_gueltig, log_level_gueltig};
use switchboard_signaling::KoordinatorConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Koordinator- und Aushandlungs-Einstellungen
    pub signaling: SignalingEinstellungen,
    /// Zugangsdaten der externen SFU
    pub livekit: LivekitEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Koordinator- und Aushandlungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Oeffentliche Adresse, die in Aushandlungs-Antworten erscheint
    pub oeffentliche_adresse: String,
    /// Untere Grenze des Portbereichs (0 = Standard-Port 7880 melden)
    pub port_min: u16,
    /// Obere Grenze des Portbereichs
    pub port_max: u16,
    /// Bevorzugter Video-Codec
    pub bevorzugter_video_codec: String,
    /// Lebensdauer ausgestellter Grants in Sekunden
    pub grant_gueltigkeit_sek: u64,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self {
            oeffentliche_adresse: "127.0.0.1".into(),
            port_min: 0,
            port_max: 0,
            bevorzugter_video_codec: "H264".into(),
            grant_gueltigkeit_sek: 6 * 60 * 60,
        }
    }
}

/// Zugangsdaten der externen SFU
///
/// Nicht gesetzte Felder werden aus der Umgebung aufgeloest.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LivekitEinstellungen {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub url: Option<String>,
}

impl std::fmt::Debug for LivekitEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivekitEinstellungen")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .field("url", &self.url)
            .finish()
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error" oder
    /// Direktiven wie "info,switchboard_signaling=debug"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Bind-Adresse fuer Metriken und Health
    pub bind_adresse: String,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
    /// Abstand zwischen zwei Registry-Stichproben in Sekunden
    pub stichproben_intervall_sek: u64,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            bind_adresse: "0.0.0.0".into(),
            port: 9300,
            stichproben_intervall_sek: 5,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config
                    .pruefen()
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!(
                "Ungueltiges Log-Format '{}' (erlaubt: text, json)",
                self.logging.format
            );
        }
        Ok(())
    }

    /// Baut die Koordinator-Konfiguration aus dem `[signaling]`-Abschnitt
    pub fn koordinator_config(&self) -> KoordinatorConfig {
        KoordinatorConfig {
            bevorzugter_video_codec: self.signaling.bevorzugter_video_codec.clone(),
            grant_gueltigkeit: Duration::from_secs(self.signaling.grant_gueltigkeit_sek),
        }
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!(
            "{}:{}",
            self.observability.bind_adresse, self.observability.port
        )
    }

    pub fn stichproben_intervall(&self) -> Duration {
        Duration::from_secs(self.observability.stichproben_intervall_sek.max(1))
    }
}
