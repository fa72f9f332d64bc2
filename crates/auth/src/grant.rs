//! Grant-Claims im Format der externen SFU
//!
//! Ein Grant ist ein HS256-JWT. `iss` traegt die Key-ID, `sub` und `jti`
//! die Identitaet des Teilnehmers, `video` die raumbezogenen Rechte.

use serde::{Deserialize, Serialize};
use switchboard_core::types::{ParticipantId, RoomId};

/// Rechte, die ein Grant fuer einen Raum verleiht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantBerechtigungen {
    /// Raum betreten
    pub raum_beitreten: bool,
    /// Tracks veroeffentlichen
    pub senden: bool,
    /// Tracks anderer Teilnehmer empfangen
    pub empfangen: bool,
}

impl GrantBerechtigungen {
    /// Beitreten, Senden und Empfangen
    pub fn vollzugriff() -> Self {
        Self {
            raum_beitreten: true,
            senden: true,
            empfangen: true,
        }
    }
}

impl Default for GrantBerechtigungen {
    fn default() -> Self {
        Self::vollzugriff()
    }
}

/// Raumbezogener Teil der Claims (Feldnamen wie von der SFU erwartet)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

/// Vollstaendige JWT-Claims eines Grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantClaims {
    /// Key-ID des Ausstellers
    pub iss: String,
    /// Identitaet des Teilnehmers
    pub sub: String,
    pub jti: String,
    /// Gueltig ab (Unix-Sekunden)
    pub nbf: i64,
    /// Gueltig bis (Unix-Sekunden)
    pub exp: i64,
    pub video: VideoGrant,
}

impl GrantClaims {
    /// Baut die Claims fuer einen Teilnehmer in einem Raum
    pub fn neu(
        api_key: &str,
        identitaet: &ParticipantId,
        raum: &RoomId,
        berechtigungen: GrantBerechtigungen,
        jetzt: i64,
        gueltigkeit_sek: i64,
    ) -> Self {
        Self {
            iss: api_key.to_string(),
            sub: identitaet.as_str().to_string(),
            jti: identitaet.as_str().to_string(),
            nbf: jetzt,
            exp: jetzt + gueltigkeit_sek,
            video: VideoGrant {
                room: raum.as_str().to_string(),
                room_join: berechtigungen.raum_beitreten,
                can_publish: berechtigungen.senden,
                can_subscribe: berechtigungen.empfangen,
            },
        }
    }
}
