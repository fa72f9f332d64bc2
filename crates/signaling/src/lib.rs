//! switchboard-signaling – Raum- und Session-Koordinator
//!
//! Dieser Crate bildet Paare aus (Raum, Teilnehmer) auf Sessions ab, stellt
//! Grants fuer die externe SFU aus und ordnet den Abbau. Medien fliessen
//! nie durch diesen Crate; die Verbindung selbst haelt die SFU.
//!
//! ## Architektur
//!
//! ```text
//! RoomCoordinator (prozessweite Registry, Schreibsperre)
//!     |
//!     +-- CredentialIssuer   (Grant pro Raum und Teilnehmer)
//!     |
//!     v
//! VoiceRoom (Mitgliedschaft, Sperre pro Raum)
//!     |
//!     v
//! RoomSession (Verbindungs-Flags, Stopp-Latch, Track-Zustand)
//!     |
//!     v
//! TransportAnbindung (Verbindungsaufbau und -abbau zur SFU)
//!
//! SFU-Rueckmeldungen -> TransportEreignisSenke -> VoiceRoom -> RoomSession
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod negotiation;
pub mod room;
pub mod session;
pub mod transport;

// Bequeme Re-Exporte
pub use config::{KoordinatorConfig, STANDARD_AUSHANDLUNGS_PORT};
pub use coordinator::{RaumInfo, RoomCoordinator};
pub use error::{SignalingError, SignalingResult};
pub use negotiation::{AushandlungsErgebnis, Codec};
pub use room::VoiceRoom;
pub use session::{MedienFaehigkeiten, RoomSession, Ssrcs};
pub use transport::{ClientSeitigeAnbindung, TransportAnbindung, TransportEreignisSenke};
