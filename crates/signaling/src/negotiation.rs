//! Aushandlung – Antwort-Payload fuer ein Client-Angebot
//!
//! Die eigentliche Medien-Aushandlung uebernimmt die externe SFU. Der
//! Koordinator antwortet mit einem SDP, das nur einen Datenkanal beschreibt
//! und Grant und SFU-URL als eigene Attribute traegt. Der Client liest beide
//! aus und verbindet sich damit direkt.

use serde::{Deserialize, Serialize};
use switchboard_core::event::MedienArt;

/// SDP-Attribut mit dem ausgestellten Grant
pub const ATTRIBUT_GRANT: &str = "livekit-token";
/// SDP-Attribut mit der URL der SFU
pub const ATTRIBUT_URL: &str = "livekit-url";

/// Adresse im SDP solange keine oeffentliche Adresse gestartet wurde
const UNBESTIMMTE_ADRESSE: &str = "0.0.0.0";

/// Codec-Eintrag aus der Praeferenzliste des Clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Codec {
    pub name: String,
    #[serde(rename = "type")]
    pub art: MedienArt,
    pub payload_type: u8,
    pub priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtx_payload_type: Option<u8>,
}

impl Codec {
    /// Kurzform fuer einen Codec ohne RTX
    pub fn neu(name: impl Into<String>, art: MedienArt, payload_type: u8, priority: u32) -> Self {
        Self {
            name: name.into(),
            art,
            payload_type,
            priority,
            rtx_payload_type: None,
        }
    }
}

/// Ergebnis einer Aushandlung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AushandlungsErgebnis {
    /// SDP-Antwort mit eingebettetem Grant und SFU-URL
    pub sdp: String,
    /// Gewaehlter Video-Codec
    pub selected_video_codec: String,
    /// Ausgestellter Grant
    pub grant: String,
    /// URL der SFU
    pub url: String,
}

/// Waehlt den Video-Codec fuer die Antwort
///
/// Der erste Eintrag mit dem bevorzugten Namen gewinnt; fehlt er in der
/// Liste, wird der bevorzugte Name trotzdem gemeldet.
pub fn video_codec_waehlen(codecs: &[Codec], bevorzugt: &str) -> String {
    codecs
        .iter()
        .find(|c| c.name == bevorzugt)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| bevorzugt.to_string())
}

/// Baut die SDP-Antwort
///
/// `adresse` ist die oeffentliche Adresse aus `starten`; ohne Start wird
/// `0.0.0.0` eingetragen.
pub fn sdp_antwort_bauen(adresse: Option<&str>, grant: &str, url: &str) -> String {
    let ip = adresse.unwrap_or(UNBESTIMMTE_ADRESSE);
    let zeilen = [
        "v=0".to_string(),
        format!("o=- 0 0 IN IP4 {ip}"),
        "s=Switchboard Session".to_string(),
        format!("c=IN IP4 {ip}"),
        "t=0 0".to_string(),
        "m=application 9 UDP/DTLS/SCTP webrtc-datachannel".to_string(),
        "a=ice-ufrag:switchboard".to_string(),
        "a=ice-pwd:switchboard".to_string(),
        format!("a=fingerprint:sha-256 {}", ["00"; 32].join(":")),
        "a=setup:actpass".to_string(),
        "a=mid:0".to_string(),
        "a=sctp-port:5000".to_string(),
        "a=max-message-size:262144".to_string(),
        format!("a={ATTRIBUT_GRANT}:{grant}"),
        format!("a={ATTRIBUT_URL}:{url}"),
    ];
    zeilen.join("\r\n")
}

/// Liest den Wert eines `a=<name>:<wert>`-Attributs aus einem SDP
pub fn sdp_attribut<'a>(sdp: &'a str, name: &str) -> Option<&'a str> {
    sdp.lines().find_map(|zeile| {
        zeile
            .trim_end_matches('\r')
            .strip_prefix("a=")?
            .strip_prefix(name)?
            .strip_prefix(':')
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
