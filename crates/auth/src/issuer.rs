//! Grant-Aussteller
//!
//! `CredentialIssuer` ist die Naht zur externen SFU: der Koordinator kennt
//! nur diesen Trait. `JwtIssuer` signiert Grants lokal mit HS256 und dem
//! geteilten Secret der SFU, ohne Netzwerkzugriff.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use switchboard_core::types::{ParticipantId, RoomId};

use crate::credentials::Zugangsdaten;
use crate::error::{AuthError, AuthResult};
use crate::grant::{GrantBerechtigungen, GrantClaims};

/// Standard-Lebensdauer eines Grants: 6 Stunden
pub const STANDARD_GRANT_GUELTIGKEIT: Duration = Duration::from_secs(6 * 60 * 60);

/// Stellt zeitlich begrenzte Grants fuer die externe SFU aus
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Stellt einen signierten Grant fuer `identitaet` in `raum` aus
    async fn grant_ausstellen(
        &self,
        identitaet: &ParticipantId,
        raum: &RoomId,
        berechtigungen: GrantBerechtigungen,
    ) -> AuthResult<String>;

    /// Key-ID, mit der dieser Aussteller signiert
    fn key_id(&self) -> &str;
}

/// HS256-JWT-Aussteller mit dem geteilten Secret der SFU
pub struct JwtIssuer {
    api_key: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    gueltigkeit_sek: i64,
}

impl JwtIssuer {
    /// Erstellt einen Aussteller aus aufgeloesten Zugangsdaten
    ///
    /// Schlaegt sofort fehl wenn Key oder Secret leer sind.
    pub fn neu(zugangsdaten: &Zugangsdaten, gueltigkeit: Duration) -> AuthResult<Self> {
        if zugangsdaten.api_key.is_empty() || zugangsdaten.api_secret.is_empty() {
            return Err(AuthError::ZugangsdatenFehlen(
                "API-Key und API-Secret sind erforderlich".into(),
            ));
        }
        let gueltigkeit_sek = i64::try_from(gueltigkeit.as_secs())
            .map_err(|_| AuthError::intern("Grant-Gueltigkeit zu gross"))?;
        let secret = zugangsdaten.api_secret.as_bytes();

        Ok(Self {
            api_key: zugangsdaten.api_key.clone(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            header: Header::new(Algorithm::HS256),
            gueltigkeit_sek,
        })
    }

    /// Signiert beliebige Claims zu einem kompakten JWT
    pub fn signieren(&self, claims: &GrantClaims) -> AuthResult<String> {
        encode(&self.header, claims, &self.encoding_key).map_err(AuthError::Signieren)
    }

    /// Prueft Signatur und Gueltigkeitsfenster eines selbst ausgestellten Grants
    pub fn verifizieren(&self, token: &str) -> AuthResult<GrantClaims> {
        let mut validation = Validation::new(self.header.alg);
        validation.validate_nbf = true;
        validation.leeway = 0;

        let token_data =
            decode::<GrantClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenAbgelaufen,
                    ErrorKind::ImmatureSignature => AuthError::TokenNochNichtGueltig,
                    _ => AuthError::token_ungueltig(e.to_string()),
                }
            })?;
        Ok(token_data.claims)
    }
}

#[async_trait]
impl CredentialIssuer for JwtIssuer {
    async fn grant_ausstellen(
        &self,
        identitaet: &ParticipantId,
        raum: &RoomId,
        berechtigungen: GrantBerechtigungen,
    ) -> AuthResult<String> {
        let claims = GrantClaims::neu(
            &self.api_key,
            identitaet,
            raum,
            berechtigungen,
            Utc::now().timestamp(),
            self.gueltigkeit_sek,
        );
        let token = self.signieren(&claims)?;
        tracing::debug!(
            participant_id = %identitaet,
            room_id = %raum,
            exp = claims.exp,
            "Grant ausgestellt"
        );
        Ok(token)
    }

    fn key_id(&self) -> &str {
        &self.api_key
    }
}

// Secret nie in Logs
impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("api_key", &self.api_key)
            .field("gueltigkeit_sek", &self.gueltigkeit_sek)
            .finish_non_exhaustive()
    }
}
