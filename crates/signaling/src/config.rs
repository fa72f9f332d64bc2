//! Konfiguration fuer den Raum-Koordinator

use std::time::Duration;

use switchboard_auth::STANDARD_GRANT_GUELTIGKEIT;

/// Port, der gemeldet wird wenn beim Start kein Portbereich angegeben ist
pub const STANDARD_AUSHANDLUNGS_PORT: u16 = 7880;

/// Konfiguration fuer den Koordinator
#[derive(Debug, Clone)]
pub struct KoordinatorConfig {
    /// Video-Codec, der bei der Aushandlung gewaehlt wird
    pub bevorzugter_video_codec: String,
    /// Lebensdauer ausgestellter Grants
    pub grant_gueltigkeit: Duration,
}

impl Default for KoordinatorConfig {
    fn default() -> Self {
        Self {
            bevorzugter_video_codec: "H264".to_string(),
            grant_gueltigkeit: STANDARD_GRANT_GUELTIGKEIT,
        }
    }
}
