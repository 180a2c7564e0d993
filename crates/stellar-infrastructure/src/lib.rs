pub mod config_service;
pub mod in_memory_session_repository;
pub mod json_session_repository;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::in_memory_session_repository::InMemorySessionRepository;
pub use crate::json_session_repository::JsonSessionRepository;
pub use crate::paths::StellarPaths;
