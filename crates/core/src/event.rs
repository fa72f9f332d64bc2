//! Ereignis-Definitionen
//!
//! Zwei Ereignisstroeme laufen durch Switchboard:
//! - [`TransportEreignis`] – Rueckmeldungen der externen SFU zu einer Session
//!   (Verbindung, Trennung, Tracks)
//! - [`RaumEreignis`] – Mitgliedschaftsaenderungen, die der Koordinator fuer
//!   Presence-Abonnenten veroeffentlicht

use crate::types::{ParticipantId, RoomId, RoomKind};
use serde::{Deserialize, Serialize};

/// Medienart eines Tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedienArt {
    Audio,
    Video,
}

/// Rueckmeldungen des externen Transports zu einer einzelnen Session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportEreignis {
    /// Transport-Verbindung steht
    Verbunden,
    /// Transport hat die Verbindung beendet
    Getrennt,
    /// Teilnehmer veroeffentlicht einen Track
    TrackVeroeffentlicht { art: MedienArt },
    /// Teilnehmer hat einen Track zurueckgezogen
    TrackZurueckgezogen { art: MedienArt },
    /// Teilnehmer empfaengt einen Track eines anderen Teilnehmers
    TrackAbonniert { von: ParticipantId, art: MedienArt },
    /// Abonnement wurde beendet
    TrackAbbestellt { von: ParticipantId, art: MedienArt },
}

/// Mitgliedschaftsaenderungen in Raeumen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaumEreignis {
    /// Ein Raum wurde angelegt
    RaumErstellt { room_id: RoomId, kind: RoomKind },
    /// Ein Teilnehmer ist einem Raum beigetreten
    TeilnehmerBeigetreten {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// Ein Teilnehmer hat einen Raum verlassen
    TeilnehmerVerlassen {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// Ein Raum wurde aufgeloest
    RaumAufgeloest { room_id: RoomId },
}

impl RaumEreignis {
    /// Raum auf den sich das Ereignis bezieht
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::RaumErstellt { room_id, .. }
            | Self::TeilnehmerBeigetreten { room_id, .. }
            | Self::TeilnehmerVerlassen { room_id, .. }
            | Self::RaumAufgeloest { room_id } => room_id,
        }
    }
}
