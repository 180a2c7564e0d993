//! Wires configuration into the running service graph.

use crate::channel::RealtimeChannel;
use crate::delivery::DeliveryHub;
use crate::state::AppState;
use anyhow::Context;
use std::sync::Arc;
use stellar_application::MessagePipeline;
use stellar_core::auth::AuthGate;
use stellar_core::config::{AppConfig, StorageBackend};
use stellar_core::session::{SessionManager, SessionRepository};
use stellar_infrastructure::{InMemorySessionRepository, JsonSessionRepository, StellarPaths};
use stellar_interaction::{OpenAiTextGenerator, RoxyProfileClient};
use tracing::info;

pub fn auth_gate(config: &AppConfig) -> anyhow::Result<AuthGate> {
    let ttl = chrono::Duration::days(config.auth.token_ttl_days);
    Ok(AuthGate::new(config.auth.token_secret.as_bytes(), ttl)?)
}

pub fn session_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn SessionRepository>> {
    match config.storage.backend {
        StorageBackend::Json => {
            let paths = StellarPaths::new(config.storage.data_dir.as_deref())?;
            let repository = JsonSessionRepository::new(paths.sessions_dir())
                .context("Failed to open session store")?;
            info!(dir = %repository.sessions_dir().display(), "Using JSON session store");
            Ok(Arc::new(repository))
        }
        StorageBackend::Memory => {
            info!("Using in-memory session store; sessions are lost on restart");
            Ok(Arc::new(InMemorySessionRepository::new()))
        }
    }
}

/// Builds every component from `config`. Fails on the first missing secret
/// or unusable endpoint.
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let gate = Arc::new(auth_gate(config)?);
    let repository = session_repository(config)?;

    let profile = RoxyProfileClient::from_config(&config.profile)
        .context("Failed to configure the profile service")?;
    let generator = OpenAiTextGenerator::from_config(&config.generation)
        .context("Failed to configure the text generator")?;
    info!(model = generator.model(), "Text generator ready");

    let session_manager = Arc::new(SessionManager::new(repository.clone(), Arc::new(profile)));
    let pipeline = Arc::new(
        MessagePipeline::new(repository, Arc::new(generator), config.generation.timeout())
            .with_session_locks(session_manager.session_locks()),
    );
    let channel = Arc::new(RealtimeChannel::new(
        gate.clone(),
        session_manager.clone(),
        pipeline,
        Arc::new(DeliveryHub::new()),
    ));

    Ok(AppState::new(
        gate,
        session_manager,
        channel,
        config.auth.cookie_name.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.token_secret = "s3cret".into();
        config.profile.api_key = Some("profile-key".into());
        config.generation.api_key = Some("generation-key".into());
        config.storage.data_dir = Some(dir.path().to_path_buf());
        config
    }

    #[test]
    fn test_build_state_with_json_store() {
        let dir = TempDir::new().unwrap();
        let state = build_state(&config(&dir)).unwrap();

        assert_eq!(state.cookie_name(), "userToken");
        assert!(dir.path().join("sessions").is_dir());
    }

    #[test]
    fn test_missing_generation_key_fails_fast() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.generation.api_key = None;

        assert!(build_state(&config).is_err());
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.auth.token_secret.clear();

        assert!(build_state(&config).is_err());
    }

    #[test]
    fn test_memory_backend_skips_data_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.storage.backend = StorageBackend::Memory;
        config.storage.data_dir = Some(dir.path().join("unused"));

        build_state(&config).unwrap();
        assert!(!dir.path().join("unused").exists());
    }
}
