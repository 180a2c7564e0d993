//! Session domain module.
//!
//! This module contains all session-related domain models, repository interfaces,
//! and management logic.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionStatus`, `ProfileParams`)
//! - `message`: Conversation message types (`Sender`, `Message`)
//! - `repository`: Repository trait for session persistence
//! - `manager`: Session lifecycle management (`SessionManager`)
//! - `locks`: Keyed async locks used to serialize per-session and per-owner work
//!
//! # Usage
//!
//! ```ignore
//! use stellar_core::session::{Session, SessionRepository, SessionManager};
//! use stellar_core::session::{Message, Sender};
//! ```

mod locks;
mod manager;
mod message;
mod model;
mod repository;

// Re-export public API
pub use locks::KeyedLocks;
pub use manager::SessionManager;
pub use message::{Message, Sender};
pub use model::{ProfileParams, Session, SessionStatus};
pub use repository::SessionRepository;
