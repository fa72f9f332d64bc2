//! Fehlertypen fuer die Grant-Ausstellung

use thiserror::Error;

/// Alle moeglichen Fehler bei Zugangsdaten und Grants
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Konfiguration ---
    /// API-Key oder Secret fehlen; tritt nur beim Aufbau auf
    #[error("Zugangsdaten fehlen: {0}")]
    ZugangsdatenFehlen(String),

    // --- Token ---
    #[error("Grant ungueltig: {0}")]
    TokenUngueltig(String),

    #[error("Grant abgelaufen")]
    TokenAbgelaufen,

    #[error("Grant noch nicht gueltig")]
    TokenNochNichtGueltig,

    /// Claims konnten nicht signiert werden
    #[error("Signieren fehlgeschlagen: {0}")]
    Signieren(jsonwebtoken::errors::Error),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl AuthError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    pub fn token_ungueltig(msg: impl Into<String>) -> Self {
        Self::TokenUngueltig(msg.into())
    }
}

/// Result-Alias fuer die Grant-Ausstellung
pub type AuthResult<T> = Result<T, AuthError>;
