//! Configuration loading
//!
//! Configuration file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `ENCORE_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/encore/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file at step 3 is not an error; a file named explicitly at step 1
//! or 2 must exist and parse.

use crate::sort::ListSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "ENCORE_CONFIG";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoreConfig {
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub sort: ListSettings,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// User playback preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Keep the current shuffle state when starting playback implicitly
    #[serde(default = "default_true")]
    pub keep_shuffle: bool,
    /// Rewind the current song on "previous" once past the rewind threshold
    #[serde(default = "default_true")]
    pub rewind_with_prev: bool,
    /// Leave playback paused across skips instead of resuming
    #[serde(default)]
    pub remember_pause: bool,
    /// Pause when a song repeats under track repeat
    #[serde(default)]
    pub pause_on_repeat: bool,
    /// Delay before persisting state after a change
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// Broadcast channel capacity for playback events
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_save_debounce_ms() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    100
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            keep_shuffle: true,
            rewind_with_prev: true,
            remember_pause: false,
            pause_on_repeat: false,
            save_debounce_ms: default_save_debounce_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Saved-state storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database file; in-memory storage is used when absent
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl EncoreConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EncoreConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration following the priority order
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
            debug!("No config file at {}", path.display());
        } else {
            warn!("Could not determine platform config directory");
        }

        info!("Using default configuration");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.playback.event_capacity == 0 {
            return Err(Error::Config(
                "playback.event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Platform default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("encore").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{SortDirection, SortMode};

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EncoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, EncoreConfig::default());
        assert!(config.playback.keep_shuffle);
        assert!(config.playback.rewind_with_prev);
        assert_eq!(config.playback.save_debounce_ms, 5000);
        assert_eq!(config.logging.level, "info");
        assert!(config.persistence.database_path.is_none());
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let config = EncoreConfig::from_toml_str(
            r#"
            [playback]
            remember_pause = true

            [sort.album_songs]
            mode = "name"
            direction = "descending"
            "#,
        )
        .unwrap();

        assert!(config.playback.remember_pause);
        assert!(config.playback.keep_shuffle);
        assert_eq!(config.sort.album_songs.mode, SortMode::Name);
        assert_eq!(config.sort.album_songs.direction, SortDirection::Descending);
        assert_eq!(config.sort.songs, ListSettings::default().songs);
    }

    #[test]
    fn test_zero_event_capacity_rejected() {
        let result = EncoreConfig::from_toml_str("[playback]\nevent_capacity = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = EncoreConfig::from_toml_str("[playback\nkeep_shuffle = ");
        assert!(matches!(result, Err(Error::Toml(_))));
    }
}
