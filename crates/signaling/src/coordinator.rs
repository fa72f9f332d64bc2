//! Raum-Koordinator – prozessweite Registry aller Raeume
//!
//! Einziger Einstiegspunkt fuer Beitritt, Angebot, Schliessen und Aufloesen.
//! Der Koordinator erzwingt die raumuebergreifende Regel: pro Teilnehmer
//! hoechstens eine Session in persistenten Sprachraeumen.
//!
//! Alle schreibenden Operationen laufen nacheinander unter der
//! Schreibsperre. Lesende Abfragen gehen direkt an die Registry und liefern
//! Momentaufnahmen.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use switchboard_auth::{CredentialIssuer, GrantBerechtigungen, JwtIssuer, Zugangsdaten};
use switchboard_core::event::{RaumEreignis, TransportEreignis};
use switchboard_core::types::{ParticipantId, RoomId, RoomKind};
use tokio::sync::{broadcast, Mutex};

use crate::config::{KoordinatorConfig, STANDARD_AUSHANDLUNGS_PORT};
use crate::error::{SignalingError, SignalingResult};
use crate::negotiation::{sdp_antwort_bauen, video_codec_waehlen, AushandlungsErgebnis, Codec};
use crate::room::VoiceRoom;
use crate::session::RoomSession;
use crate::transport::{TransportAnbindung, TransportEreignisSenke};

/// Groesse des Broadcast-Kanals fuer Raum-Ereignisse
const EREIGNIS_KANAL_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// Start-Parameter und Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StartParameter {
    oeffentliche_adresse: Option<String>,
    port: u16,
}

impl Default for StartParameter {
    fn default() -> Self {
        Self {
            oeffentliche_adresse: None,
            port: STANDARD_AUSHANDLUNGS_PORT,
        }
    }
}

/// Momentaufnahme eines Raums fuer Abfragen und Diagnose
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaumInfo {
    pub id: RoomId,
    pub kind: RoomKind,
    pub teilnehmer: usize,
    pub verbunden: usize,
}

// ---------------------------------------------------------------------------
// RoomCoordinator
// ---------------------------------------------------------------------------

/// Prozessweite Registry der Raeume
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct RoomCoordinator {
    inner: Arc<KoordinatorInner>,
}

struct KoordinatorInner {
    config: KoordinatorConfig,
    issuer: Arc<dyn CredentialIssuer>,
    transport_url: String,
    start: RwLock<StartParameter>,
    /// Alle aktiven Raeume, indiziert nach Raum-ID
    raeume: DashMap<RoomId, Arc<VoiceRoom>>,
    /// Serialisiert alle schreibenden Operationen
    schreibsperre: Mutex<()>,
    ereignis_tx: broadcast::Sender<RaumEreignis>,
}

impl RoomCoordinator {
    /// Erstellt einen Koordinator mit einem beliebigen Grant-Aussteller
    pub fn neu(
        config: KoordinatorConfig,
        issuer: Arc<dyn CredentialIssuer>,
        transport_url: impl Into<String>,
    ) -> Self {
        let (ereignis_tx, _) = broadcast::channel(EREIGNIS_KANAL_GROESSE);
        Self {
            inner: Arc::new(KoordinatorInner {
                config,
                issuer,
                transport_url: transport_url.into(),
                start: RwLock::new(StartParameter::default()),
                raeume: DashMap::new(),
                schreibsperre: Mutex::new(()),
                ereignis_tx,
            }),
        }
    }

    /// Erstellt einen Koordinator mit JWT-Aussteller aus Zugangsdaten
    pub fn mit_zugangsdaten(
        config: KoordinatorConfig,
        zugangsdaten: &Zugangsdaten,
    ) -> SignalingResult<Self> {
        let issuer = JwtIssuer::neu(zugangsdaten, config.grant_gueltigkeit)?;
        Ok(Self::neu(config, Arc::new(issuer), zugangsdaten.url.clone()))
    }

    /// Loest Zugangsdaten auf (Argument, dann Umgebung) und erstellt den
    /// Koordinator. Fehlen Key oder Secret, schlaegt der Aufbau fehl.
    pub fn aus_umgebung(
        config: KoordinatorConfig,
        api_key: Option<String>,
        api_secret: Option<String>,
        url: Option<String>,
    ) -> SignalingResult<Self> {
        let zugangsdaten = Zugangsdaten::aufloesen(api_key, api_secret, url)?;
        Self::mit_zugangsdaten(config, &zugangsdaten)
    }

    /// Merkt sich die oeffentliche Adresse fuer Aushandlungs-Antworten
    ///
    /// Der Portbereich wird nur angenommen; gemeldet wird `port_min`, oder
    /// 7880 wenn `port_min` 0 ist.
    pub fn starten(&self, oeffentliche_adresse: impl Into<String>, port_min: u16, port_max: u16) {
        let port = if port_min != 0 {
            port_min
        } else {
            STANDARD_AUSHANDLUNGS_PORT
        };
        let adresse = oeffentliche_adresse.into();

        tracing::info!(
            adresse = %adresse,
            port,
            port_min,
            port_max,
            url = %self.inner.transport_url,
            "Raum-Koordinator gestartet"
        );

        *self.inner.start.write() = StartParameter {
            oeffentliche_adresse: Some(adresse),
            port,
        };
    }

    // -----------------------------------------------------------------------
    // Schreibende Operationen
    // -----------------------------------------------------------------------

    /// Laesst einen Teilnehmer einem Raum beitreten
    ///
    /// Bei persistenten Sprachraeumen werden vorherige Sessions des
    /// Teilnehmers in allen Sprachraeumen zuerst geschlossen. Fehlt der Raum,
    /// wird er mit `kind` angelegt. Eine Session mit gleicher ID im selben
    /// Raum wird ersetzt und beendet. Die Session uebernimmt die Art des
    /// registrierten Raums.
    pub async fn beitreten(
        &self,
        room_id: RoomId,
        participant_id: ParticipantId,
        anbindung: Arc<dyn TransportAnbindung>,
        kind: RoomKind,
    ) -> Arc<RoomSession> {
        let _sperre = self.inner.schreibsperre.lock().await;

        if kind.ist_persistente_sprache() {
            for alte in self.sprach_sessions_von(&participant_id) {
                tracing::info!(
                    participant_id = %participant_id,
                    alter_raum = %alte.room_id(),
                    neuer_raum = %room_id,
                    "Vorherige Sprach-Session wird geschlossen"
                );
                if let Err(e) = self.schliessen_intern(&alte).await {
                    tracing::warn!(
                        participant_id = %participant_id,
                        room_id = %alte.room_id(),
                        fehler = %e,
                        "Abbau der vorherigen Session fehlgeschlagen"
                    );
                }
            }
        }

        let raum = self.raum_holen_oder_anlegen(&room_id, kind);
        let session = Arc::new(RoomSession::neu(
            participant_id.clone(),
            room_id.clone(),
            raum.kind(),
            anbindung,
        ));

        if let Some(verdraengt) = raum.beitreten(Arc::clone(&session)) {
            tracing::debug!(
                participant_id = %participant_id,
                room_id = %room_id,
                "Session mit gleicher ID ersetzt"
            );
            if let Err(e) = verdraengt.beenden().await {
                tracing::warn!(
                    participant_id = %participant_id,
                    room_id = %room_id,
                    fehler = %e,
                    "Abbau der ersetzten Session fehlgeschlagen"
                );
            }
        }

        session
    }

    /// Schliesst eine Session; mehrfaches Schliessen ist ein No-Op
    pub async fn schliessen(&self, session: &Arc<RoomSession>) -> SignalingResult<()> {
        let _sperre = self.inner.schreibsperre.lock().await;
        self.schliessen_intern(session).await
    }

    /// Legt einen leeren Raum an
    ///
    /// Ein vorhandener Raum mit derselben ID wird ersetzt, aber nicht
    /// aufgeloest. Seine Sessions bleiben bis zu ihrem eigenen Schliessen
    /// bestehen.
    pub async fn raum_erstellen(&self, room_id: RoomId, kind: RoomKind) {
        let _sperre = self.inner.schreibsperre.lock().await;

        let raum = Arc::new(VoiceRoom::neu(
            room_id.clone(),
            kind,
            self.inner.ereignis_tx.clone(),
        ));
        if let Some(alt) = self.inner.raeume.insert(room_id.clone(), raum) {
            tracing::warn!(
                room_id = %room_id,
                teilnehmer = alt.teilnehmer_anzahl(),
                "Vorhandener Raum ersetzt ohne Aufloesen"
            );
        }

        tracing::info!(room_id = %room_id, kind = %kind, "Raum erstellt");
        let _ = self
            .inner
            .ereignis_tx
            .send(RaumEreignis::RaumErstellt { room_id, kind });
    }

    /// Loest einen Raum auf und entfernt ihn; unbekannte IDs sind ein No-Op
    pub async fn raum_aufloesen(&self, room_id: &RoomId) -> SignalingResult<()> {
        let _sperre = self.inner.schreibsperre.lock().await;

        match self.inner.raeume.remove(room_id) {
            Some((_, raum)) => raum.aufloesen().await,
            None => {
                tracing::debug!(room_id = %room_id, "Raum zum Aufloesen nicht gefunden");
                Ok(())
            }
        }
    }

    /// Loest alle Raeume auf und leert die Registry
    ///
    /// Jeder Raum wird aufgeloest, auch wenn einer fehlschlaegt; der erste
    /// Fehler wird danach zurueckgegeben.
    pub async fn stoppen(&self) -> SignalingResult<()> {
        let _sperre = self.inner.schreibsperre.lock().await;

        let ids: Vec<RoomId> = self.inner.raeume.iter().map(|r| r.key().clone()).collect();
        tracing::info!(raeume = ids.len(), "Raum-Koordinator wird gestoppt");

        let mut erster_fehler = None;
        for id in ids {
            let Some((_, raum)) = self.inner.raeume.remove(&id) else {
                continue;
            };
            if let Err(e) = raum.aufloesen().await {
                tracing::warn!(room_id = %id, fehler = %e, "Aufloesen beim Stoppen fehlgeschlagen");
                erster_fehler.get_or_insert(e);
            }
        }

        match erster_fehler {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Aushandlung und Verbindung
    // -----------------------------------------------------------------------

    /// Beantwortet das Angebot einer Session mit Grant und SFU-Endpunkt
    ///
    /// Einzige Nebenwirkung ist die Grant-Ausstellung. Die Session muss
    /// Mitglied des aktuell registrierten Raums sein.
    pub async fn angebot(
        &self,
        session: &Arc<RoomSession>,
        _sdp_angebot: &str,
        codecs: &[Codec],
    ) -> SignalingResult<AushandlungsErgebnis> {
        self.raum_der_session(session)?;

        let grant = self
            .inner
            .issuer
            .grant_ausstellen(
                session.participant_id(),
                session.room_id(),
                GrantBerechtigungen::vollzugriff(),
            )
            .await?;

        let adresse = self.inner.start.read().oeffentliche_adresse.clone();
        let sdp = sdp_antwort_bauen(adresse.as_deref(), &grant, &self.inner.transport_url);
        let selected_video_codec =
            video_codec_waehlen(codecs, &self.inner.config.bevorzugter_video_codec);

        tracing::debug!(
            participant_id = %session.participant_id(),
            room_id = %session.room_id(),
            codec = %selected_video_codec,
            "Angebot beantwortet"
        );

        Ok(AushandlungsErgebnis {
            sdp,
            selected_video_codec,
            grant,
            url: self.inner.transport_url.clone(),
        })
    }

    /// Baut die Transport-Verbindung einer Session mit einem Grant auf
    pub async fn verbinden(&self, session: &Arc<RoomSession>, grant: &str) -> SignalingResult<()> {
        let raum = self.raum_der_session(session)?;
        raum.session_verbinden(session, grant, &self.inner.transport_url).await
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Momentaufnahme der Sessions eines Raums; leer fuer unbekannte IDs
    pub fn sessions_auflisten(&self, room_id: &RoomId) -> Vec<Arc<RoomSession>> {
        self.raum(room_id).map(|r| r.sessions()).unwrap_or_default()
    }

    pub fn raum(&self, room_id: &RoomId) -> Option<Arc<VoiceRoom>> {
        self.inner.raeume.get(room_id).map(|r| Arc::clone(r.value()))
    }

    /// Momentaufnahme aller Raeume
    pub fn raeume(&self) -> Vec<RaumInfo> {
        self.inner
            .raeume
            .iter()
            .map(|r| RaumInfo {
                id: r.key().clone(),
                kind: r.kind(),
                teilnehmer: r.teilnehmer_anzahl(),
                verbunden: r.verbundene_sessions().len(),
            })
            .collect()
    }

    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    pub fn session_anzahl(&self) -> usize {
        self.inner.raeume.iter().map(|r| r.teilnehmer_anzahl()).sum()
    }

    pub fn verbundene_anzahl(&self) -> usize {
        self.inner
            .raeume
            .iter()
            .map(|r| r.verbundene_sessions().len())
            .sum()
    }

    /// Oeffentliche Adresse aus `starten`
    pub fn oeffentliche_adresse(&self) -> Option<String> {
        self.inner.start.read().oeffentliche_adresse.clone()
    }

    /// Gemeldeter Aushandlungs-Port
    pub fn port(&self) -> u16 {
        self.inner.start.read().port
    }

    pub fn transport_url(&self) -> &str {
        &self.inner.transport_url
    }

    /// Key-ID des Grant-Ausstellers (nie das Secret)
    pub fn key_id(&self) -> &str {
        self.inner.issuer.key_id()
    }

    pub fn config(&self) -> &KoordinatorConfig {
        &self.inner.config
    }

    /// Abonniert die Raum-Ereignisse
    pub fn ereignisse_abonnieren(&self) -> broadcast::Receiver<RaumEreignis> {
        self.inner.ereignis_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    /// Sessions des Teilnehmers in allen persistenten Sprachraeumen
    fn sprach_sessions_von(&self, participant_id: &ParticipantId) -> Vec<Arc<RoomSession>> {
        self.inner
            .raeume
            .iter()
            .filter(|r| r.kind().ist_persistente_sprache())
            .filter_map(|r| r.session(participant_id))
            .collect()
    }

    /// Registrierter Raum, in dem genau diese Session Mitglied ist
    ///
    /// Eine Session aus einem aufgeloesten oder ersetzten Raum gleicher ID
    /// gilt als unbekannt.
    fn raum_der_session(&self, session: &Arc<RoomSession>) -> SignalingResult<Arc<VoiceRoom>> {
        let raum = self
            .raum(session.room_id())
            .filter(|raum| {
                raum.session(session.participant_id())
                    .is_some_and(|mitglied| Arc::ptr_eq(&mitglied, session))
            })
            .ok_or_else(|| SignalingError::RaumNichtGefunden(session.room_id().clone()))?;
        Ok(raum)
    }

    fn raum_holen_oder_anlegen(&self, room_id: &RoomId, kind: RoomKind) -> Arc<VoiceRoom> {
        let raum = match self.inner.raeume.entry(room_id.clone()) {
            Entry::Occupied(eintrag) => return Arc::clone(eintrag.get()),
            Entry::Vacant(eintrag) => {
                let raum = Arc::new(VoiceRoom::neu(
                    room_id.clone(),
                    kind,
                    self.inner.ereignis_tx.clone(),
                ));
                eintrag.insert(Arc::clone(&raum));
                raum
            }
        };

        tracing::info!(room_id = %room_id, kind = %kind, "Raum beim ersten Beitritt angelegt");
        let _ = self.inner.ereignis_tx.send(RaumEreignis::RaumErstellt {
            room_id: room_id.clone(),
            kind,
        });
        raum
    }

    /// Schliessen ohne Schreibsperre; der Aufrufer haelt sie bereits
    async fn schliessen_intern(&self, session: &Arc<RoomSession>) -> SignalingResult<()> {
        match self.raum(session.room_id()) {
            Some(raum) => raum.verlassen(session).await,
            None => {
                tracing::debug!(
                    participant_id = %session.participant_id(),
                    room_id = %session.room_id(),
                    "Raum der Session existiert nicht mehr"
                );
                session.beenden().await.map(|_| ())
            }
        }
    }
}

impl TransportEreignisSenke for RoomCoordinator {
    fn ereignis_melden(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        ereignis: TransportEreignis,
    ) -> bool {
        let Some(raum) = self.raum(room_id) else {
            tracing::debug!(
                room_id = %room_id,
                participant_id = %participant_id,
                "Transport-Ereignis fuer unbekannten Raum verworfen"
            );
            return false;
        };

        let angewendet = raum.ereignis_anwenden(participant_id, &ereignis);
        tracing::trace!(
            room_id = %room_id,
            participant_id = %participant_id,
            ereignis = ?ereignis,
            angewendet,
            "Transport-Ereignis"
        );
        angewendet
    }
}

impl std::fmt::Debug for RoomCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomCoordinator")
            .field("transport_url", &self.inner.transport_url)
            .field("key_id", &self.key_id())
            .field("raeume", &self.raum_anzahl())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ClientSeitigeAnbindung;

    fn koordinator() -> RoomCoordinator {
        let zugangsdaten = Zugangsdaten::aufloesen_mit(
            Some("devkey".into()),
            Some("geheim".into()),
            None,
            |_| None,
        )
        .unwrap();
        RoomCoordinator::mit_zugangsdaten(KoordinatorConfig::default(), &zugangsdaten).unwrap()
    }

    fn anbindung(name: &str) -> Arc<dyn TransportAnbindung> {
        Arc::new(ClientSeitigeAnbindung::neu(ParticipantId::from(name)))
    }

    #[test]
    fn fehlende_zugangsdaten_sind_fatal() {
        let fehler = RoomCoordinator::mit_zugangsdaten(
            KoordinatorConfig::default(),
            &Zugangsdaten {
                api_key: String::new(),
                api_secret: String::new(),
                url: "ws://localhost:7880".into(),
            },
        )
        .unwrap_err();
        assert!(fehler.ist_zugangsdaten_fehler());
    }

    #[test]
    fn starten_setzt_adresse_und_port() {
        let k = koordinator();
        assert_eq!(k.oeffentliche_adresse(), None);
        assert_eq!(k.port(), 7880);

        k.starten("203.0.113.7", 0, 0);
        assert_eq!(k.oeffentliche_adresse().as_deref(), Some("203.0.113.7"));
        assert_eq!(k.port(), 7880);

        k.starten("203.0.113.7", 50000, 60000);
        assert_eq!(k.port(), 50000);
    }

    #[test]
    fn accessoren_zeigen_kein_secret() {
        let k = koordinator();
        assert_eq!(k.key_id(), "devkey");
        assert_eq!(k.transport_url(), "ws://localhost:7880");
        assert!(!format!("{k:?}").contains("geheim"));
    }

    #[tokio::test]
    async fn beitreten_legt_raum_an() {
        let k = koordinator();
        let mut rx = k.ereignisse_abonnieren();

        let s = k
            .beitreten(RoomId::from("r1"), ParticipantId::from("alice"), anbindung("alice"), RoomKind::GuildVoice)
            .await;

        assert_eq!(s.room_id().as_str(), "r1");
        assert_eq!(k.raum_anzahl(), 1);
        assert_eq!(k.session_anzahl(), 1);
        assert!(matches!(rx.try_recv().unwrap(), RaumEreignis::RaumErstellt { .. }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            RaumEreignis::TeilnehmerBeigetreten { .. }
        ));

        let info = k.raeume();
        assert_eq!(
            info,
            vec![RaumInfo {
                id: RoomId::from("r1"),
                kind: RoomKind::GuildVoice,
                teilnehmer: 1,
                verbunden: 0,
            }]
        );
    }

    #[tokio::test]
    async fn transport_ereignisse_werden_angewendet() {
        use crate::session::MedienFaehigkeiten;
        use switchboard_core::event::MedienArt;

        let k = koordinator();
        let raum = RoomId::from("r1");
        let alice = ParticipantId::from("alice");
        let s = k
            .beitreten(raum.clone(), alice.clone(), anbindung("alice"), RoomKind::GuildVoice)
            .await;

        assert!(k.ereignis_melden(&raum, &alice, TransportEreignis::Verbunden));
        assert!(k.ereignis_melden(
            &raum,
            &alice,
            TransportEreignis::TrackVeroeffentlicht { art: MedienArt::Audio }
        ));
        assert!(s.ist_verbunden());
        assert!(s.sendet_audio());
        assert_eq!(k.verbundene_anzahl(), 1);

        assert!(!k.ereignis_melden(&RoomId::from("gibts-nicht"), &alice, TransportEreignis::Getrennt));

        k.schliessen(&s).await.unwrap();
        assert!(!k.ereignis_melden(&raum, &alice, TransportEreignis::Verbunden));
        assert!(!s.ist_verbunden());
        assert!(!s.sendet_audio());
    }
}
