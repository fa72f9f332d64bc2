//! Zugangsdaten fuer die externe SFU
//!
//! Jeder Wert wird in dieser Reihenfolge gesucht:
//! 1. expliziter Wert (Konfigurationsdatei / Konstruktor)
//! 2. Umgebungsvariable (`LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`, `LIVEKIT_URL`)
//! 3. nur fuer die URL: `ws://localhost:7880`
//!
//! Leere Strings zaehlen als nicht gesetzt. Fehlen Key oder Secret, schlaegt
//! die Aufloesung mit `AuthError::ZugangsdatenFehlen` fehl.

use crate::error::{AuthError, AuthResult};

/// Umgebungsvariable fuer die Key-ID
pub const ENV_API_KEY: &str = "LIVEKIT_API_KEY";
/// Umgebungsvariable fuer das Signatur-Secret
pub const ENV_API_SECRET: &str = "LIVEKIT_API_SECRET";
/// Umgebungsvariable fuer die Basis-URL der SFU
pub const ENV_URL: &str = "LIVEKIT_URL";
/// Standard-URL wenn weder Konfiguration noch Umgebung eine liefern
pub const STANDARD_URL: &str = "ws://localhost:7880";

/// Aufgeloeste Zugangsdaten
#[derive(Clone, PartialEq, Eq)]
pub struct Zugangsdaten {
    pub api_key: String,
    pub api_secret: String,
    pub url: String,
}

impl Zugangsdaten {
    /// Loest die Zugangsdaten gegen die Prozess-Umgebung auf
    pub fn aufloesen(
        api_key: Option<String>,
        api_secret: Option<String>,
        url: Option<String>,
    ) -> AuthResult<Self> {
        Self::aufloesen_mit(api_key, api_secret, url, |name| std::env::var(name).ok())
    }

    /// Loest die Zugangsdaten gegen eine beliebige Umgebungs-Quelle auf
    pub fn aufloesen_mit<F>(
        api_key: Option<String>,
        api_secret: Option<String>,
        url: Option<String>,
        umgebung: F,
    ) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let waehlen = |explizit: Option<String>, variable: &str| {
            nicht_leer(explizit).or_else(|| nicht_leer(umgebung(variable)))
        };

        let api_key = waehlen(api_key, ENV_API_KEY);
        let api_secret = waehlen(api_secret, ENV_API_SECRET);
        let url = waehlen(url, ENV_URL).unwrap_or_else(|| STANDARD_URL.to_string());

        match (api_key, api_secret) {
            (Some(api_key), Some(api_secret)) => Ok(Self {
                api_key,
                api_secret,
                url,
            }),
            (None, _) => Err(AuthError::ZugangsdatenFehlen(format!(
                "API-Key fehlt (Konfiguration oder {ENV_API_KEY})"
            ))),
            (_, None) => Err(AuthError::ZugangsdatenFehlen(format!(
                "API-Secret fehlt (Konfiguration oder {ENV_API_SECRET})"
            ))),
        }
    }
}

// Secret nie in Logs
impl std::fmt::Debug for Zugangsdaten {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zugangsdaten")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("url", &self.url)
            .finish()
    }
}

fn nicht_leer(wert: Option<String>) -> Option<String> {
    wert.filter(|w| !w.trim().is_empty())
}
