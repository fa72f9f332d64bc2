//! switchboard-core – Gemeinsame Typen, Ereignisse und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Auth-, Signaling- und
//! Server-Crate gemeinsam nutzen: Raum- und Teilnehmer-IDs, die Raumart,
//! Transport-Ereignisse und den Fehlertyp fuer den externen Transport.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{TransportError, TransportResult};
pub use event::{MedienArt, RaumEreignis, TransportEreignis};
pub use types::{ParticipantId, RoomId, RoomKind};
