//! Room-Session – Mitgliedschaft eines Teilnehmers in einem Raum
//!
//! Haelt pro Teilnehmer:
//! - Identitaet, Raum und Raumart
//! - das Handle auf die Transport-Verbindung
//! - Verbindungs- und Stopp-Flag
//! - Track-Zustand (wer sendet was, wer empfaengt wen)
//!
//! `gestoppt` ist ein Einweg-Latch: ist es gesetzt, ist die Session nicht
//! verbunden, haelt keine Tracks und loest nie wieder einen Transport-Abbau
//! aus. Alle Zustandswechsel laufen unter einer Sperre pro Session, damit
//! Latch und Verbindungsflag nie auseinanderlaufen.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use switchboard_core::event::{MedienArt, TransportEreignis};
use switchboard_core::types::{ParticipantId, RoomId, RoomKind};

use crate::error::{SignalingError, SignalingResult};
use crate::transport::TransportAnbindung;

// ---------------------------------------------------------------------------
// Faehigkeiten
// ---------------------------------------------------------------------------

/// Medien-Faehigkeiten einer Session, gespeist aus Transport-Ereignissen
pub trait MedienFaehigkeiten {
    /// Veroeffentlicht der Teilnehmer gerade Audio?
    fn sendet_audio(&self) -> bool;

    /// Veroeffentlicht der Teilnehmer gerade Video?
    fn sendet_video(&self) -> bool;

    /// Empfaengt der Teilnehmer den Track `art` von `von`?
    fn hat_track_abonniert(&self, von: &ParticipantId, art: MedienArt) -> bool;
}

/// SSRC-Tripel, das ein Client fuer seine eingehenden Streams ankuendigt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ssrcs {
    pub audio_ssrc: u32,
    pub video_ssrc: u32,
    pub rtx_ssrc: u32,
}

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TrackZustand {
    sendet_audio: bool,
    sendet_video: bool,
    abonniert: HashSet<(ParticipantId, MedienArt)>,
}

impl TrackZustand {
    fn leeren(&mut self) {
        self.sendet_audio = false;
        self.sendet_video = false;
        self.abonniert.clear();
    }
}

#[derive(Debug, Default)]
struct SessionZustand {
    verbunden: bool,
    gestoppt: bool,
    tracks: TrackZustand,
    eingehende_ssrcs: Option<Ssrcs>,
}

// ---------------------------------------------------------------------------
// RoomSession
// ---------------------------------------------------------------------------

/// Mitgliedschaft eines Teilnehmers in genau einem Raum
///
/// Wird als `Arc<RoomSession>` zwischen Raum und Aufrufer geteilt.
pub struct RoomSession {
    participant_id: ParticipantId,
    room_id: RoomId,
    kind: RoomKind,
    anbindung: Arc<dyn TransportAnbindung>,
    zustand: Mutex<SessionZustand>,
}

impl RoomSession {
    /// Erstellt eine neue, nicht verbundene Session
    pub fn neu(
        participant_id: ParticipantId,
        room_id: RoomId,
        kind: RoomKind,
        anbindung: Arc<dyn TransportAnbindung>,
    ) -> Self {
        Self {
            participant_id,
            room_id,
            kind,
            anbindung,
            zustand: Mutex::new(SessionZustand::default()),
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    /// Steht die Transport-Verbindung?
    pub fn ist_verbunden(&self) -> bool {
        self.zustand.lock().verbunden
    }

    /// WebRTC-Sicht auf dieselbe Verbindung
    ///
    /// Die Medienverbindung ist die Transport-Verbindung zur SFU, beide
    /// Flags folgen demselben Lebenszyklus.
    pub fn ist_webrtc_verbunden(&self) -> bool {
        self.ist_verbunden()
    }

    /// Wurde die Session bereits beendet?
    pub fn ist_gestoppt(&self) -> bool {
        self.zustand.lock().gestoppt
    }

    /// Speichert die vom Client angekuendigten eingehenden SSRCs
    pub fn eingehende_ssrcs_setzen(&self, ssrcs: Ssrcs) {
        self.zustand.lock().eingehende_ssrcs = Some(ssrcs);
    }

    pub fn eingehende_ssrcs(&self) -> Option<Ssrcs> {
        self.zustand.lock().eingehende_ssrcs
    }

    /// Baut die Transport-Verbindung mit einem Grant auf
    ///
    /// Bei einem Fehler bleibt die Session unverbunden und der Fehler geht
    /// unveraendert an den Aufrufer. Wird die Session waehrend des Aufbaus
    /// beendet, wird die frische Verbindung sofort wieder abgebaut.
    pub async fn verbinden(&self, grant: &str, url: &str) -> SignalingResult<()> {
        if self.ist_gestoppt() {
            return Err(SignalingError::SessionBeendet(self.participant_id.clone()));
        }

        self.anbindung.verbinden(grant, url).await?;

        let gestoppt = {
            let mut zustand = self.zustand.lock();
            if !zustand.gestoppt {
                zustand.verbunden = true;
            }
            zustand.gestoppt
        };

        if gestoppt {
            tracing::debug!(
                participant_id = %self.participant_id,
                "Session waehrend Verbindungsaufbau beendet, Verbindung wird abgebaut"
            );
            self.anbindung.trennen().await?;
            return Err(SignalingError::SessionBeendet(self.participant_id.clone()));
        }
        Ok(())
    }

    /// Setzt den Stopp-Latch und baut die Transport-Verbindung ab
    ///
    /// Gibt `Ok(false)` zurueck wenn die Session schon beendet war; der
    /// Transport wird dann nicht erneut angesprochen.
    pub(crate) async fn beenden(&self) -> SignalingResult<bool> {
        {
            let mut zustand = self.zustand.lock();
            if zustand.gestoppt {
                return Ok(false);
            }
            zustand.gestoppt = true;
            zustand.verbunden = false;
            zustand.tracks.leeren();
        }

        self.anbindung.trennen().await?;
        tracing::debug!(
            participant_id = %self.participant_id,
            room_id = %self.room_id,
            "Session beendet"
        );
        Ok(true)
    }

    /// Uebersetzt ein Transport-Ereignis in Session-Zustand
    ///
    /// Beendete Sessions ignorieren alle Ereignisse.
    pub(crate) fn ereignis_anwenden(&self, ereignis: &TransportEreignis) -> bool {
        let mut zustand = self.zustand.lock();
        if zustand.gestoppt {
            return false;
        }

        match ereignis {
            TransportEreignis::Verbunden => zustand.verbunden = true,
            TransportEreignis::Getrennt => {
                zustand.verbunden = false;
                zustand.tracks.leeren();
            }
            TransportEreignis::TrackVeroeffentlicht { art } => match art {
                MedienArt::Audio => zustand.tracks.sendet_audio = true,
                MedienArt::Video => zustand.tracks.sendet_video = true,
            },
            TransportEreignis::TrackZurueckgezogen { art } => match art {
                MedienArt::Audio => zustand.tracks.sendet_audio = false,
                MedienArt::Video => zustand.tracks.sendet_video = false,
            },
            TransportEreignis::TrackAbonniert { von, art } => {
                zustand.tracks.abonniert.insert((von.clone(), *art));
            }
            TransportEreignis::TrackAbbestellt { von, art } => {
                zustand.tracks.abonniert.remove(&(von.clone(), *art));
            }
        }
        true
    }
}

impl MedienFaehigkeiten for RoomSession {
    fn sendet_audio(&self) -> bool {
        self.zustand.lock().tracks.sendet_audio
    }

    fn sendet_video(&self) -> bool {
        self.zustand.lock().tracks.sendet_video
    }

    fn hat_track_abonniert(&self, von: &ParticipantId, art: MedienArt) -> bool {
        self.zustand
            .lock()
            .tracks
            .abonniert
            .contains(&(von.clone(), art))
    }
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let zustand = self.zustand.lock();
        f.debug_struct("RoomSession")
            .field("participant_id", &self.participant_id)
            .field("room_id", &self.room_id)
            .field("kind", &self.kind)
            .field("verbunden", &zustand.verbunden)
            .field("gestoppt", &zustand.gestoppt)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
