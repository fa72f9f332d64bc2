//! switchboard-auth – Grant-Ausstellung fuer die externe SFU
//!
//! Dieses Crate implementiert:
//! - Aufloesung der Zugangsdaten (explizit, Umgebung, Standardwert)
//! - Grant-Claims im Format der SFU (HS256-JWT mit Video-Grant)
//! - `CredentialIssuer`-Trait und die JWT-Implementierung `JwtIssuer`

pub mod credentials;
pub mod error;
pub mod grant;
pub mod issuer;

// Bequeme Re-Exporte
pub use credentials::Zugangsdaten;
pub use error::{AuthError, AuthResult};
pub use grant::{GrantBerechtigungen, GrantClaims, VideoGrant};
pub use issuer::{CredentialIssuer, JwtIssuer, STANDARD_GRANT_GUELTIGKEIT};
