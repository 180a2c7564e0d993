//! Configuration service implementation.
//!
//! Loads `AppConfig` from a TOML file (`~/.config/stellar/config.toml` unless
//! a path is given), then layers environment overrides on top and validates
//! the result.

use crate::paths::StellarPaths;
use stellar_core::config::{AppConfig, StorageBackend};
use stellar_core::error::{Result, StellarError};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables that override file values.
pub mod env {
    pub const TOKEN_SECRET: &str = "STELLAR_TOKEN_SECRET";
    pub const TOKEN_SECRET_FALLBACK: &str = "JWT_SECRET";
    pub const PROFILE_API_KEY: &str = "ROXY_API_KEY";
    pub const GENERATION_API_KEY: &str = "OPENAI_API_KEY";
    pub const GENERATION_MODEL: &str = "OPENAI_MODEL_NAME";
    pub const PORT: &str = "PORT";
    pub const DATA_DIR: &str = "STELLAR_DATA_DIR";
    pub const STORAGE_BACKEND: &str = "STELLAR_STORAGE";
}

/// Builds the process configuration once at startup.
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    path: Option<PathBuf>,
}

impl ConfigService {
    /// Reads from `path`, or from the default config file when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Loads, overrides from the process environment, and validates.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Same as [`ConfigService::load`] with an explicit environment lookup.
    pub fn load_with_env<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the TOML file without environment overrides.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_file(&self) -> Result<AppConfig> {
        let (path, required) = match &self.path {
            Some(path) => (path.clone(), true),
            None => (StellarPaths::config_file()?, false),
        };

        if !path.exists() {
            if required {
                return Err(StellarError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(AppConfig::default());
        }

        Self::parse_file(&path)
    }

    fn parse_file(path: &Path) -> Result<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(secret) = get(env::TOKEN_SECRET).or_else(|| get(env::TOKEN_SECRET_FALLBACK)) {
        config.auth.token_secret = secret;
    }
    if let Some(key) = get(env::PROFILE_API_KEY) {
        config.profile.api_key = Some(key);
    }
    if let Some(key) = get(env::GENERATION_API_KEY) {
        config.generation.api_key = Some(key);
    }
    if let Some(model) = get(env::GENERATION_MODEL) {
        config.generation.model = model;
    }
    if let Some(port) = get(env::PORT) {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|e| StellarError::config(format!("{} is not a port: {e}", env::PORT)))?;
    }
    if let Some(dir) = get(env::DATA_DIR) {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(backend) = get(env::STORAGE_BACKEND) {
        config.storage.backend = match backend.trim() {
            "json" => StorageBackend::Json,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(StellarError::config(format!(
                    "{} must be 'json' or 'memory', got '{other}'",
                    env::STORAGE_BACKEND
                )));
            }
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_file_values_are_loaded() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
            [server]
            port = 8080

            [auth]
            token_secret = "from-file"
            "#,
        );

        let config = ConfigService::new(Some(path))
            .load_with_env(lookup(&[]))
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_secret, "from-file");
        assert_eq!(config.auth.token_ttl_days, 7);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[auth]\ntoken_secret = \"from-file\"\n");

        let config = ConfigService::new(Some(path))
            .load_with_env(lookup(&[
                ("STELLAR_TOKEN_SECRET", "from-env"),
                ("OPENAI_API_KEY", "sk-test"),
                ("ROXY_API_KEY", "roxy"),
                ("PORT", "4000"),
                ("STELLAR_DATA_DIR", "/var/lib/stellar"),
                ("STELLAR_STORAGE", "memory"),
            ]))
            .unwrap();

        assert_eq!(config.auth.token_secret, "from-env");
        assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.profile.api_key.as_deref(), Some("roxy"));
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/var/lib/stellar")));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_jwt_secret_fallback() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");

        let config = ConfigService::new(Some(path))
            .load_with_env(lookup(&[("JWT_SECRET", "legacy")]))
            .unwrap();

        assert_eq!(config.auth.token_secret, "legacy");
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");

        let err = ConfigService::new(Some(path))
            .load_with_env(lookup(&[]))
            .unwrap_err();

        assert!(matches!(err, StellarError::Config(_)));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let service = ConfigService::new(Some(dir.path().join("absent.toml")));

        assert!(matches!(service.load_file(), Err(StellarError::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[auth]\ntoken_secret = \"s\"\n");
        let service = ConfigService::new(Some(path));

        assert!(service.load_with_env(lookup(&[("PORT", "http")])).is_err());
        assert!(
            service
                .load_with_env(lookup(&[("STELLAR_STORAGE", "postgres")]))
                .is_err()
        );
    }

    #[test]
    fn test_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[server\nport = ");

        let err = ConfigService::new(Some(path)).load_file().unwrap_err();
        assert!(matches!(err, StellarError::Serialization { .. }));
    }
}
