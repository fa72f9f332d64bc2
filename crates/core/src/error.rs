//! Fehlertypen fuer den externen Transport
//!
//! Verbindungsaufbau und -abbau zur externen SFU koennen fehlschlagen.
//! Diese Fehler werden unveraendert an den Aufrufer weitergereicht; eine
//! Wiederholung entscheidet ausschliesslich der Aufrufer.

use thiserror::Error;

/// Result-Alias fuer Transport-Operationen
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Fehler beim Verbindungsaufbau oder -abbau zur externen SFU
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    /// Die SFU hat den Grant abgelehnt
    #[error("Authentifizierung fehlgeschlagen: {0}")]
    Authentifizierung(String),

    #[error("Interner Transportfehler: {0}")]
    Intern(String),
}

impl TransportError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn ein erneuter Versuch sinnvoll sein koennte
    ///
    /// Ein abgelehnter Grant wird durch Wiederholen nicht gueltig.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = TransportError::Authentifizierung("Token abgelaufen".into());
        assert_eq!(
            e.to_string(),
            "Authentifizierung fehlgeschlagen: Token abgelaufen"
        );
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(TransportError::Zeitlimit("connect".into()).ist_wiederholbar());
        assert!(TransportError::Verbindung("reset".into()).ist_wiederholbar());
        assert!(!TransportError::Authentifizierung("401".into()).ist_wiederholbar());
        assert!(!TransportError::intern("kaputt").ist_wiederholbar());
    }
}
