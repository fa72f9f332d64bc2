//! Gemeinsame Identifikationstypen fuer Switchboard
//!
//! Raum- und Teilnehmer-IDs kommen als Strings vom Chat-Backend. Das
//! Newtype-Pattern verhindert Verwechslungen zwischen beiden zur Compilezeit.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Eindeutige Raum-ID (vom Chat-Backend vergeben)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt die rohe ID zurueck (z.B. fuer Grant-Claims)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::neu(id)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room:{}", self.0)
    }
}

/// Eindeutige Teilnehmer-ID (Benutzer-ID des Chat-Backends)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt die rohe ID zurueck (Identitaet im Grant)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::neu(id)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "participant:{}", self.0)
    }
}

/// Art eines Raums
///
/// Persistente Sprachraeume (`GuildVoice`, `DmVoice`) erlauben prozessweit
/// hoechstens eine Session pro Teilnehmer. Stream-Raeume nicht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomKind {
    GuildVoice,
    DmVoice,
    Stream,
}

impl RoomKind {
    /// Gibt true fuer Sprachraeume mit exklusiver Mitgliedschaft zurueck
    pub fn ist_persistente_sprache(&self) -> bool {
        matches!(self, Self::GuildVoice | Self::DmVoice)
    }

    /// Name auf dem Draht (`guild-voice`, `dm-voice`, `stream`)
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::GuildVoice => "guild-voice",
            Self::DmVoice => "dm-voice",
            Self::Stream => "stream",
        }
    }
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

/// Fehler beim Parsen einer Raumart
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unbekannte Raumart: {0}")]
pub struct UnbekannteRaumart(pub String);

impl FromStr for RoomKind {
    type Err = UnbekannteRaumart;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guild-voice" => Ok(Self::GuildVoice),
            "dm-voice" => Ok(Self::DmVoice),
            "stream" => Ok(Self::Stream),
            andere => Err(UnbekannteRaumart(andere.to_string())),
        }
    }
}
