//! Fehlertypen fuer den Raum- und Session-Koordinator

use switchboard_auth::AuthError;
use switchboard_core::types::{ParticipantId, RoomId};
use switchboard_core::TransportError;
use thiserror::Error;

/// Fehlertyp fuer den Koordinator
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Der Raum der Session existiert nicht (mehr)
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(RoomId),

    /// Die Session wurde bereits beendet und kann nicht mehr verbinden
    #[error("Session beendet: {0}")]
    SessionBeendet(ParticipantId),

    /// Zugangsdaten- oder Grant-Fehler
    #[error("Authentifizierungsfehler: {0}")]
    Auth(#[from] AuthError),

    /// Verbindungsaufbau oder -abbau zur SFU fehlgeschlagen
    #[error("Transportfehler: {0}")]
    Transport(#[from] TransportError),
}

impl SignalingError {
    /// Gibt true zurueck wenn Key oder Secret beim Aufbau gefehlt haben
    pub fn ist_zugangsdaten_fehler(&self) -> bool {
        matches!(self, Self::Auth(AuthError::ZugangsdatenFehlen(_)))
    }
}

/// Result-Typ fuer den Koordinator
pub type SignalingResult<T> = Result<T, SignalingError>;
