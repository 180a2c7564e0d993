//! HTTP and WebSocket surface of Stellar.
//!
//! - `server`: axum router, handlers, and the WebSocket connection loop
//! - `channel`: the real-time channel state machine (`RealtimeChannel`)
//! - `delivery`: per-identity fan-out of server events (`DeliveryHub`)
//! - `bootstrap`: builds `AppState` from `AppConfig`

pub mod auth;
pub mod bootstrap;
pub mod channel;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod state;

pub use bootstrap::build_state;
pub use server::{build_router, serve};
pub use state::AppState;
