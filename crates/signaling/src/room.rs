//! Voice-Room – Mitgliedschaft eines Raums
//!
//! Ein Raum haelt seine Sessions nach Teilnehmer-ID und meldet jede
//! Mitgliedschaftsaenderung auf dem Ereigniskanal des Koordinators.
//!
//! Zustandsmaschine: Aktiv -> Aufgeloest (terminal). Ein aufgeloester Raum
//! nimmt keine Sessions mehr an und hat keine Verbindung mehr zum
//! Ereigniskanal.
//!
//! Alle Mitgliedschaftsaenderungen laufen unter einer Sperre pro Raum. Die
//! Sperre wird nie ueber einen Transport-Aufruf hinweg gehalten.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use switchboard_core::event::{RaumEreignis, TransportEreignis};
use switchboard_core::types::{ParticipantId, RoomId, RoomKind};
use tokio::sync::broadcast;

use crate::error::SignalingResult;
use crate::session::RoomSession;

struct RaumInnen {
    /// Sessions, indiziert nach Teilnehmer-ID
    sessions: HashMap<ParticipantId, Arc<RoomSession>>,
    /// Ereigniskanal des Koordinators; `None` nach dem Aufloesen
    ereignis_tx: Option<broadcast::Sender<RaumEreignis>>,
}

/// Ein Raum mit seinen Sessions
pub struct VoiceRoom {
    id: RoomId,
    kind: RoomKind,
    innen: Mutex<RaumInnen>,
}

impl VoiceRoom {
    /// Erstellt einen leeren, aktiven Raum
    pub fn neu(id: RoomId, kind: RoomKind, ereignis_tx: broadcast::Sender<RaumEreignis>) -> Self {
        Self {
            id,
            kind,
            innen: Mutex::new(RaumInnen {
                sessions: HashMap::new(),
                ereignis_tx: Some(ereignis_tx),
            }),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    /// Wurde der Raum bereits aufgeloest?
    pub fn ist_aufgeloest(&self) -> bool {
        self.innen.lock().ereignis_tx.is_none()
    }

    /// Registriert eine Session unter ihrer Teilnehmer-ID
    ///
    /// Ein vorhandener Eintrag mit derselben ID wird ersetzt und
    /// zurueckgegeben. Aufgeloeste Raeume nehmen keine Sessions an.
    pub(crate) fn beitreten(&self, session: Arc<RoomSession>) -> Option<Arc<RoomSession>> {
        let participant_id = session.participant_id().clone();
        let mut innen = self.innen.lock();

        let Some(tx) = innen.ereignis_tx.clone() else {
            tracing::warn!(
                room_id = %self.id,
                participant_id = %participant_id,
                "Beitritt zu aufgeloestem Raum ignoriert"
            );
            return None;
        };

        let verdraengt = innen.sessions.insert(participant_id.clone(), session);
        drop(innen);

        tracing::info!(room_id = %self.id, participant_id = %participant_id, "Teilnehmer beigetreten");
        let _ = tx.send(RaumEreignis::TeilnehmerBeigetreten {
            room_id: self.id.clone(),
            participant_id,
        });
        verdraengt
    }

    /// Entfernt eine Session und beendet sie
    ///
    /// Der Eintrag wird nur entfernt wenn er genau diese Session ist; eine
    /// spaeter unter derselben ID beigetretene Session bleibt unberuehrt.
    /// Der Abbau laeuft auch fuer Sessions, die nicht (mehr) im Raum sind,
    /// und ist durch den Stopp-Latch der Session idempotent.
    pub async fn verlassen(&self, session: &Arc<RoomSession>) -> SignalingResult<()> {
        let participant_id = session.participant_id();
        let entfernt = {
            let mut innen = self.innen.lock();
            let ist_eintrag = innen
                .sessions
                .get(participant_id)
                .is_some_and(|eintrag| Arc::ptr_eq(eintrag, session));
            if ist_eintrag {
                innen.sessions.remove(participant_id);
                innen.ereignis_tx.clone()
            } else {
                None
            }
        };

        if let Some(tx) = entfernt {
            tracing::info!(room_id = %self.id, participant_id = %participant_id, "Teilnehmer verlassen");
            let _ = tx.send(RaumEreignis::TeilnehmerVerlassen {
                room_id: self.id.clone(),
                participant_id: participant_id.clone(),
            });
        }

        session.beenden().await?;
        Ok(())
    }

    /// Baut die Transport-Verbindung einer Session mit einem Grant auf
    pub async fn session_verbinden(
        &self,
        session: &Arc<RoomSession>,
        grant: &str,
        url: &str,
    ) -> SignalingResult<()> {
        tracing::debug!(
            room_id = %self.id,
            participant_id = %session.participant_id(),
            "Session verbindet sich mit der SFU"
        );

        match session.verbinden(grant, url).await {
            Ok(()) => {
                tracing::info!(
                    room_id = %self.id,
                    participant_id = %session.participant_id(),
                    "Session mit der SFU verbunden"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    room_id = %self.id,
                    participant_id = %session.participant_id(),
                    fehler = %e,
                    "Verbindung zur SFU fehlgeschlagen"
                );
                Err(e)
            }
        }
    }

    /// Loest den Raum auf: beendet alle Sessions, leert die Mitgliedschaft
    /// und trennt den Raum vom Ereigniskanal
    ///
    /// Jede Session wird beendet, auch wenn ein Abbau fehlschlaegt; der
    /// erste Fehler wird danach zurueckgegeben.
    pub(crate) async fn aufloesen(&self) -> SignalingResult<()> {
        let (sessions, tx) = {
            let mut innen = self.innen.lock();
            let sessions: Vec<Arc<RoomSession>> =
                innen.sessions.drain().map(|(_, s)| s).collect();
            (sessions, innen.ereignis_tx.take())
        };

        let Some(tx) = tx else {
            tracing::debug!(room_id = %self.id, "Raum war bereits aufgeloest");
            return Ok(());
        };

        tracing::info!(room_id = %self.id, sessions = sessions.len(), "Raum wird aufgeloest");

        let mut erster_fehler = None;
        for session in sessions {
            let _ = tx.send(RaumEreignis::TeilnehmerVerlassen {
                room_id: self.id.clone(),
                participant_id: session.participant_id().clone(),
            });
            if let Err(e) = session.beenden().await {
                tracing::warn!(
                    room_id = %self.id,
                    participant_id = %session.participant_id(),
                    fehler = %e,
                    "Abbau beim Aufloesen fehlgeschlagen"
                );
                erster_fehler.get_or_insert(e);
            }
        }

        let _ = tx.send(RaumEreignis::RaumAufgeloest {
            room_id: self.id.clone(),
        });

        match erster_fehler {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Wendet ein Transport-Ereignis unter der Raumsperre an
    pub(crate) fn ereignis_anwenden(
        &self,
        participant_id: &ParticipantId,
        ereignis: &TransportEreignis,
    ) -> bool {
        let innen = self.innen.lock();
        match innen.sessions.get(participant_id) {
            Some(session) => session.ereignis_anwenden(ereignis),
            None => false,
        }
    }

    /// Gibt die Session eines Teilnehmers zurueck
    pub fn session(&self, participant_id: &ParticipantId) -> Option<Arc<RoomSession>> {
        self.innen.lock().sessions.get(participant_id).cloned()
    }

    /// Momentaufnahme aller Sessions
    pub fn sessions(&self) -> Vec<Arc<RoomSession>> {
        self.innen.lock().sessions.values().cloned().collect()
    }

    /// Anzahl der Sessions im Raum
    pub fn teilnehmer_anzahl(&self) -> usize {
        self.innen.lock().sessions.len()
    }

    /// Alle Sessions mit stehender Transport-Verbindung (ohne Reihenfolge)
    pub fn verbundene_sessions(&self) -> Vec<Arc<RoomSession>> {
        self.innen
            .lock()
            .sessions
            .values()
            .filter(|s| s.ist_verbunden())
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for VoiceRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceRoom")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("teilnehmer", &self.teilnehmer_anzahl())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
