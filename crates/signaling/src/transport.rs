//! Transport-Anbindung – Naht zur externen SFU
//!
//! Jede Session haelt ein opakes Handle auf ihre Transport-Verbindung.
//! Verbindungsaufbau und -abbau sind die einzigen Stellen, an denen der
//! Koordinator auf externe I/O wartet.
//!
//! Rueckmeldungen der SFU (verbunden, getrennt, Tracks) fliessen nicht
//! ueber dieses Handle, sondern ueber [`TransportEreignisSenke`].

use async_trait::async_trait;
use switchboard_core::event::TransportEreignis;
use switchboard_core::types::{ParticipantId, RoomId};
use switchboard_core::TransportResult;

/// Handle auf die Transport-Verbindung einer Session
#[async_trait]
pub trait TransportAnbindung: Send + Sync {
    /// Baut die Verbindung mit einem ausgestellten Grant auf
    async fn verbinden(&self, grant: &str, url: &str) -> TransportResult<()>;

    /// Baut die Verbindung ab und gibt alle Transport-Ressourcen frei
    async fn trennen(&self) -> TransportResult<()>;
}

/// Empfaenger fuer Rueckmeldungen der externen SFU
///
/// Der Transport meldet Ereignisse pro (Raum, Teilnehmer). Die Senke
/// uebersetzt sie unter der Sperre des Raums in Session-Zustand.
pub trait TransportEreignisSenke: Send + Sync {
    /// Wendet ein Ereignis an. Gibt false zurueck wenn Raum oder Session
    /// unbekannt sind oder die Session bereits beendet ist.
    fn ereignis_melden(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        ereignis: TransportEreignis,
    ) -> bool;
}

/// Anbindung fuer Clients, die sich selbst mit der SFU verbinden
///
/// Der Client erhaelt den Grant in der Aushandlungs-Antwort und verbindet
/// sich direkt. Serverseitig gibt es keine Medienverbindung; Aufbau und
/// Abbau werden nur protokolliert.
#[derive(Debug, Clone)]
pub struct ClientSeitigeAnbindung {
    participant_id: ParticipantId,
}

impl ClientSeitigeAnbindung {
    pub fn neu(participant_id: ParticipantId) -> Self {
        Self { participant_id }
    }
}

#[async_trait]
impl TransportAnbindung for ClientSeitigeAnbindung {
    async fn verbinden(&self, _grant: &str, url: &str) -> TransportResult<()> {
        tracing::debug!(
            participant_id = %self.participant_id,
            url = %url,
            "Client verbindet sich direkt mit der SFU"
        );
        Ok(())
    }

    async fn trennen(&self) -> TransportResult<()> {
        tracing::debug!(
            participant_id = %self.participant_id,
            "Client trennt sich direkt von der SFU"
        );
        Ok(())
    }
}
