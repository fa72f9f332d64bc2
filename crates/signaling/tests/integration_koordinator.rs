//! Integration-Tests fuer den Raum-Koordinator (Fake-Transport und Fake-Aussteller)

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use switchboard_auth::{
    AuthResult, CredentialIssuer, GrantBerechtigungen, JwtIssuer, Zugangsdaten,
};
use switchboard_core::event::MedienArt;
use switchboard_core::types::{ParticipantId, RoomId, RoomKind};
use switchboard_core::{TransportError, TransportResult};
use switchboard_signaling::negotiation::{sdp_attribut, ATTRIBUT_GRANT, ATTRIBUT_URL};
use switchboard_signaling::{
    Codec, KoordinatorConfig, RoomCoordinator, SignalingError, TransportAnbindung,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeAnbindung {
    verbindungen: AtomicUsize,
    trennungen: AtomicUsize,
    verbinden_schlaegt_fehl: AtomicBool,
}

impl FakeAnbindung {
    fn trennungen(&self) -> usize {
        self.trennungen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportAnbindung for FakeAnbindung {
    async fn verbinden(&self, _grant: &str, _url: &str) -> TransportResult<()> {
        tokio::task::yield_now().await;
        if self.verbinden_schlaegt_fehl.load(Ordering::SeqCst) {
            return Err(TransportError::Verbindung("SFU nicht erreichbar".into()));
        }
        self.verbindungen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn trennen(&self) -> TransportResult<()> {
        tokio::task::yield_now().await;
        self.trennungen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Zeichnet jede Grant-Anfrage auf
#[derive(Default)]
struct AufzeichnenderIssuer {
    anfragen: Mutex<Vec<(ParticipantId, RoomId, GrantBerechtigungen)>>,
}

#[async_trait]
impl CredentialIssuer for AufzeichnenderIssuer {
    async fn grant_ausstellen(
        &self,
        identitaet: &ParticipantId,
        raum: &RoomId,
        berechtigungen: GrantBerechtigungen,
    ) -> AuthResult<String> {
        self.anfragen
            .lock()
            .push((identitaet.clone(), raum.clone(), berechtigungen));
        Ok(format!("grant-{}-{}", identitaet.as_str(), raum.as_str()))
    }

    fn key_id(&self) -> &str {
        "fake-key"
    }
}

fn koordinator() -> (RoomCoordinator, Arc<AufzeichnenderIssuer>) {
    let issuer = Arc::new(AufzeichnenderIssuer::default());
    let k = RoomCoordinator::neu(
        KoordinatorConfig::default(),
        Arc::clone(&issuer) as Arc<dyn CredentialIssuer>,
        "wss://sfu.test",
    );
    (k, issuer)
}

fn rid(s: &str) -> RoomId {
    RoomId::from(s)
}

fn pid(s: &str) -> ParticipantId {
    ParticipantId::from(s)
}

fn codecs(namen: &[&str]) -> Vec<Codec> {
    namen
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let art = if *name == "opus" {
                MedienArt::Audio
            } else {
                MedienArt::Video
            };
            Codec::neu(*name, art, 96 + i as u8, 1000)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Beitritt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wechsel_in_anderen_sprachraum_beendet_alte_session() {
    let (k, _) = koordinator();
    let alt_anbindung = Arc::new(FakeAnbindung::default());

    let alt = k
        .beitreten(rid("gilde-a"), pid("alice"), alt_anbindung.clone(), RoomKind::GuildVoice)
        .await;
    let neu = k
        .beitreten(rid("dm-b"), pid("alice"), Arc::new(FakeAnbindung::default()), RoomKind::DmVoice)
        .await;

    assert!(alt.ist_gestoppt());
    assert!(!neu.ist_gestoppt());
    assert_eq!(alt_anbindung.trennungen(), 1);
    assert!(k.sessions_auflisten(&rid("gilde-a")).is_empty());

    let sessions = k.sessions_auflisten(&rid("dm-b"));
    assert_eq!(sessions.len(), 1);
    assert!(Arc::ptr_eq(&sessions[0], &neu));
}

#[tokio::test]
async fn stream_beitritt_verdraengt_nichts() {
    let (k, _) = koordinator();

    let sprache = k
        .beitreten(rid("gilde"), pid("bob"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;
    let stream = k
        .beitreten(rid("stream-1"), pid("bob"), Arc::new(FakeAnbindung::default()), RoomKind::Stream)
        .await;

    assert!(!sprache.ist_gestoppt());
    assert!(!stream.ist_gestoppt());
    assert_eq!(k.session_anzahl(), 2);
}

#[tokio::test]
async fn sprachbeitritt_verdraengt_keine_stream_session() {
    let (k, _) = koordinator();

    let stream = k
        .beitreten(rid("stream-1"), pid("bob"), Arc::new(FakeAnbindung::default()), RoomKind::Stream)
        .await;
    k.beitreten(rid("gilde"), pid("bob"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    assert!(!stream.ist_gestoppt());
    assert_eq!(k.sessions_auflisten(&rid("stream-1")).len(), 1);
}

#[tokio::test]
async fn doppelter_beitritt_im_selben_raum_hinterlaesst_eine_session() {
    let (k, _) = koordinator();
    let erste_anbindung = Arc::new(FakeAnbindung::default());

    let erste = k
        .beitreten(rid("stream-1"), pid("carol"), erste_anbindung.clone(), RoomKind::Stream)
        .await;
    let zweite = k
        .beitreten(rid("stream-1"), pid("carol"), Arc::new(FakeAnbindung::default()), RoomKind::Stream)
        .await;

    let sessions = k.sessions_auflisten(&rid("stream-1"));
    assert_eq!(sessions.len(), 1);
    assert!(Arc::ptr_eq(&sessions[0], &zweite));
    assert!(erste.ist_gestoppt());
    assert_eq!(erste_anbindung.trennungen(), 1);

    // Spaetes Schliessen der ersetzten Session laesst die neue stehen
    k.schliessen(&erste).await.unwrap();
    assert_eq!(k.sessions_auflisten(&rid("stream-1")).len(), 1);
    assert_eq!(erste_anbindung.trennungen(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gleichzeitige_sprachbeitritte_hinterlassen_eine_session() {
    let (k, _) = koordinator();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let k = k.clone();
        tasks.push(tokio::spawn(async move {
            k.beitreten(
                RoomId::neu(format!("gilde-{}", i % 4)),
                ParticipantId::from("dave"),
                Arc::new(FakeAnbindung::default()),
                RoomKind::GuildVoice,
            )
            .await
        }));
    }

    let mut sessions = Vec::new();
    for t in tasks {
        sessions.push(t.await.unwrap());
    }

    assert_eq!(k.session_anzahl(), 1);
    assert_eq!(sessions.iter().filter(|s| !s.ist_gestoppt()).count(), 1);
}

// ---------------------------------------------------------------------------
// Angebot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn angebot_liefert_grant_url_und_codec() {
    let (k, issuer) = koordinator();
    k.starten("198.51.100.4", 0, 0);

    let s = k
        .beitreten(rid("gilde"), pid("erin"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;
    let ergebnis = k.angebot(&s, "v=0", &codecs(&["opus", "H264"])).await.unwrap();

    assert_eq!(ergebnis.selected_video_codec, "H264");
    assert_eq!(ergebnis.grant, "grant-erin-gilde");
    assert_eq!(ergebnis.url, "wss://sfu.test");
    assert_eq!(sdp_attribut(&ergebnis.sdp, ATTRIBUT_GRANT), Some("grant-erin-gilde"));
    assert_eq!(sdp_attribut(&ergebnis.sdp, ATTRIBUT_URL), Some("wss://sfu.test"));
    assert!(ergebnis.sdp.contains("c=IN IP4 198.51.100.4"));

    let anfragen = issuer.anfragen.lock();
    assert_eq!(
        anfragen.as_slice(),
        &[(pid("erin"), rid("gilde"), GrantBerechtigungen::vollzugriff())]
    );
}

#[tokio::test]
async fn angebot_ohne_bevorzugten_codec_faellt_zurueck() {
    let (k, _) = koordinator();
    let s = k
        .beitreten(rid("gilde"), pid("erin"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    let ergebnis = k.angebot(&s, "v=0", &codecs(&["opus"])).await.unwrap();
    assert_eq!(ergebnis.selected_video_codec, "H264");
}

#[tokio::test]
async fn angebot_hat_keine_nebenwirkung_auf_mitgliedschaft() {
    let (k, _) = koordinator();
    let s = k
        .beitreten(rid("gilde"), pid("erin"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    k.angebot(&s, "v=0", &[]).await.unwrap();
    assert_eq!(k.session_anzahl(), 1);
    assert!(!s.ist_verbunden());
    assert!(!s.ist_gestoppt());
}

#[tokio::test]
async fn angebot_nach_aufloesen_meldet_raum_nicht_gefunden() {
    let (k, issuer) = koordinator();
    let s = k
        .beitreten(rid("gilde"), pid("frank"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    k.raum_aufloesen(&rid("gilde")).await.unwrap();

    let fehler = k.angebot(&s, "v=0", &codecs(&["H264"])).await.unwrap_err();
    assert!(matches!(fehler, SignalingError::RaumNichtGefunden(ref r) if r == &rid("gilde")));
    assert!(issuer.anfragen.lock().is_empty());

    let fehler = k.verbinden(&s, "grant").await.unwrap_err();
    assert!(matches!(fehler, SignalingError::RaumNichtGefunden(_)));
}

#[tokio::test]
async fn angebot_mit_jwt_issuer_ist_verifizierbar() {
    let zugangsdaten =
        Zugangsdaten::aufloesen_mit(Some("key".into()), Some("secret".into()), None, |_| None)
            .unwrap();
    let k = RoomCoordinator::mit_zugangsdaten(KoordinatorConfig::default(), &zugangsdaten).unwrap();
    let s = k
        .beitreten(rid("gilde"), pid("gina"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    let ergebnis = k.angebot(&s, "v=0", &[]).await.unwrap();

    let pruefer = JwtIssuer::neu(&zugangsdaten, Duration::from_secs(60)).unwrap();
    let claims = pruefer.verifizieren(&ergebnis.grant).unwrap();
    assert_eq!(claims.iss, "key");
    assert_eq!(claims.sub, "gina");
    assert_eq!(claims.video.room, "gilde");
    assert!(claims.video.room_join && claims.video.can_publish && claims.video.can_subscribe);
    assert_eq!(ergebnis.url, "ws://localhost:7880");
}

// ---------------------------------------------------------------------------
// Verbindung und Abbau
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verbinden_setzt_flags() {
    let (k, _) = koordinator();
    let s = k
        .beitreten(rid("gilde"), pid("hank"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    k.verbinden(&s, "grant").await.unwrap();
    assert!(s.ist_verbunden());
    assert!(s.ist_webrtc_verbunden());
    assert_eq!(k.verbundene_anzahl(), 1);
    assert_eq!(k.raum(&rid("gilde")).unwrap().verbundene_sessions().len(), 1);
}

#[tokio::test]
async fn verbindungsfehler_wird_unveraendert_weitergegeben() {
    let (k, _) = koordinator();
    let anbindung = Arc::new(FakeAnbindung::default());
    anbindung.verbinden_schlaegt_fehl.store(true, Ordering::SeqCst);
    let s = k
        .beitreten(rid("gilde"), pid("ivy"), anbindung, RoomKind::GuildVoice)
        .await;

    let fehler = k.verbinden(&s, "grant").await.unwrap_err();
    assert!(matches!(
        fehler,
        SignalingError::Transport(TransportError::Verbindung(_))
    ));
    assert!(!s.ist_verbunden());
    assert!(!s.ist_gestoppt());
}

#[tokio::test]
async fn doppeltes_schliessen_trennt_einmal() {
    let (k, _) = koordinator();
    let anbindung = Arc::new(FakeAnbindung::default());
    let s = k
        .beitreten(rid("gilde"), pid("jack"), anbindung.clone(), RoomKind::GuildVoice)
        .await;
    k.verbinden(&s, "grant").await.unwrap();

    k.schliessen(&s).await.unwrap();
    k.schliessen(&s).await.unwrap();

    assert_eq!(anbindung.trennungen(), 1);
    assert!(s.ist_gestoppt());
    assert!(!s.ist_verbunden());
    assert_eq!(k.session_anzahl(), 0);
}

#[tokio::test]
async fn nach_aufloesen_bleibt_alles_leer() {
    let (k, _) = koordinator();
    let anbindung = Arc::new(FakeAnbindung::default());
    let s = k
        .beitreten(rid("gilde"), pid("kim"), anbindung.clone(), RoomKind::GuildVoice)
        .await;

    k.raum_aufloesen(&rid("gilde")).await.unwrap();
    assert!(s.ist_gestoppt());
    assert_eq!(anbindung.trennungen(), 1);

    k.schliessen(&s).await.unwrap();
    assert!(k.sessions_auflisten(&rid("gilde")).is_empty());
    assert!(k.raum(&rid("gilde")).is_none());
    assert_eq!(k.session_anzahl(), 0);
    assert_eq!(k.raum_anzahl(), 0);
    assert_eq!(anbindung.trennungen(), 1);
}

#[tokio::test]
async fn raum_erstellen_und_zweimal_aufloesen() {
    let (k, _) = koordinator();

    k.raum_erstellen(rid("x"), RoomKind::Stream).await;
    assert_eq!(k.raum_anzahl(), 1);
    assert_eq!(k.raum(&rid("x")).unwrap().kind(), RoomKind::Stream);

    k.raum_aufloesen(&rid("x")).await.unwrap();
    k.raum_aufloesen(&rid("x")).await.unwrap();
    assert_eq!(k.raum_anzahl(), 0);
}

#[tokio::test]
async fn raum_erstellen_ersetzt_ohne_aufloesen() {
    let (k, _) = koordinator();
    let s = k
        .beitreten(rid("x"), pid("lena"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    k.raum_erstellen(rid("x"), RoomKind::Stream).await;

    assert!(!s.ist_gestoppt());
    assert!(k.sessions_auflisten(&rid("x")).is_empty());
    assert_eq!(k.raum(&rid("x")).unwrap().kind(), RoomKind::Stream);
}

#[tokio::test]
async fn veraltete_session_nach_neuem_raum_gleicher_id() {
    let (k, issuer) = koordinator();
    let alte = k
        .beitreten(rid("r"), pid("olga"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;
    k.raum_aufloesen(&rid("r")).await.unwrap();
    let neue = k
        .beitreten(rid("r"), pid("paul"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    let fehler = k.angebot(&alte, "v=0", &codecs(&["H264"])).await.unwrap_err();
    assert!(matches!(fehler, SignalingError::RaumNichtGefunden(ref r) if r == &rid("r")));
    let fehler = k.verbinden(&alte, "grant").await.unwrap_err();
    assert!(matches!(fehler, SignalingError::RaumNichtGefunden(_)));
    assert!(issuer.anfragen.lock().is_empty());

    // Die Session im neuen Raum ist unberuehrt
    k.angebot(&neue, "v=0", &[]).await.unwrap();
    assert_eq!(issuer.anfragen.lock().len(), 1);
    assert!(!neue.ist_verbunden());
}

#[tokio::test]
async fn session_aus_ersetztem_raum_bekommt_keinen_grant() {
    let (k, issuer) = koordinator();
    let s = k
        .beitreten(rid("x"), pid("quinn"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;
    k.raum_erstellen(rid("x"), RoomKind::Stream).await;

    let fehler = k.angebot(&s, "v=0", &[]).await.unwrap_err();
    assert!(matches!(fehler, SignalingError::RaumNichtGefunden(_)));
    assert!(issuer.anfragen.lock().is_empty());
}

#[tokio::test]
async fn geschlossene_session_bekommt_keinen_grant() {
    let (k, issuer) = koordinator();
    let s = k
        .beitreten(rid("gilde"), pid("rosa"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;
    // Zweiter Teilnehmer haelt den Raum am Leben
    let _andere = k
        .beitreten(rid("gilde"), pid("sven"), Arc::new(FakeAnbindung::default()), RoomKind::Stream)
        .await;
    k.schliessen(&s).await.unwrap();

    let fehler = k.angebot(&s, "v=0", &[]).await.unwrap_err();
    assert!(matches!(fehler, SignalingError::RaumNichtGefunden(_)));
    assert!(issuer.anfragen.lock().is_empty());
}

#[tokio::test]
async fn session_uebernimmt_art_des_vorhandenen_raums() {
    let (k, _) = koordinator();
    k.raum_erstellen(rid("s"), RoomKind::Stream).await;

    let s = k
        .beitreten(rid("s"), pid("tom"), Arc::new(FakeAnbindung::default()), RoomKind::GuildVoice)
        .await;

    assert_eq!(s.kind(), RoomKind::Stream);
    assert_eq!(k.raum(&rid("s")).unwrap().kind(), RoomKind::Stream);
}

#[tokio::test]
async fn unbekannter_raum_listet_nichts() {
    let (k, _) = koordinator();
    assert!(k.sessions_auflisten(&rid("nirgends")).is_empty());
}

#[tokio::test]
async fn stoppen_loest_alle_raeume_auf() {
    let (k, _) = koordinator();
    let a = Arc::new(FakeAnbindung::default());
    let b = Arc::new(FakeAnbindung::default());
    let sa = k
        .beitreten(rid("gilde"), pid("max"), a.clone(), RoomKind::GuildVoice)
        .await;
    let sb = k
        .beitreten(rid("stream"), pid("nina"), b.clone(), RoomKind::Stream)
        .await;

    k.stoppen().await.unwrap();

    assert_eq!(k.raum_anzahl(), 0);
    assert!(sa.ist_gestoppt() && sb.ist_gestoppt());
    assert_eq!(a.trennungen() + b.trennungen(), 2);
}
