//! Unified path management for stellar files.
//!
//! ```text
//! ~/.config/stellar/           # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/stellar/      # Data directory (overridable)
//! ├── sessions/                # One JSON document per session
//! │   └── <session-id>.json
//! └── logs/                    # Daily-rotated logs
//!     └── stellar.log.YYYY-MM-DD
//! ```

use stellar_core::error::{Result, StellarError};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "stellar";

/// Resolves every on-disk location used by the process.
///
/// Directories come from the platform conventions (`dirs`) unless a data
/// directory override is supplied, which is how tests and `storage.data_dir`
/// redirect storage.
#[derive(Debug, Clone)]
pub struct StellarPaths {
    data_dir: PathBuf,
}

impl StellarPaths {
    /// Paths rooted at `data_dir` if given, else the platform data directory.
    pub fn new(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::default_data_dir()?,
        };
        Ok(Self { data_dir })
    }

    /// `<platform config dir>/stellar`
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or_else(|| StellarError::config("cannot determine the config directory"))
    }

    /// `<platform config dir>/stellar/config.toml`
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn default_data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or_else(|| StellarError::config("cannot determine the data directory"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}
