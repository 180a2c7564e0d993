//! Capability-token authentication.
//!
//! - `identity`: the caller identity asserted by a verified token (`Identity`)
//! - `gate`: stateless token verification and issuance (`AuthGate`)
//!
//! The same `AuthGate::verify` is used by one-shot HTTP requests and by
//! real-time channel handshakes; transports only differ in where the raw
//! credential is read from.

mod gate;
mod identity;

pub use gate::{AuthError, AuthGate, TokenClaims};
pub use identity::Identity;
