//! User preference management with XDG Base Directory compliance.
//!
//! Settings live in a JSON file under the XDG config home. Managed audio
//! storage and the key-value state directory default to the XDG data home
//! and can be overridden per user.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

use crate::library::importer::DEFAULT_AUDIO_EXTENSION;

/// Directory name used under every XDG base directory.
const APP_DIR: &str = "tunedeck";

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings structure with default values.
///
/// Missing keys in the settings file take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Managed storage directory override.
    pub tracks_directory: Option<String>,
    /// Key-value state directory override.
    pub state_directory: Option<String>,
    /// Extension for synthesized file names, without the dot.
    pub default_extension: String,
    /// Artwork used when a track has neither an embedded nor a custom cover.
    pub fallback_cover_url: Option<String>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            tracks_directory: None,
            state_directory: None,
            default_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
            fallback_cover_url: None,
            log_filter: "info".to_string(),
        }
    }
}

impl UserSettings {
    /// Checks values that would break imports if accepted.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for an empty or non-alphanumeric
    /// default extension.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let extension = &self.default_extension;
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SettingsError::InvalidValue {
                reason: format!("default_extension must be alphanumeric, got {extension:?}"),
            });
        }
        Ok(())
    }

    /// Resolved managed storage directory.
    #[must_use]
    pub fn tracks_directory(&self) -> PathBuf {
        self.tracks_directory
            .as_ref()
            .map_or_else(|| get_data_dir().join("tracks"), PathBuf::from)
    }

    /// Resolved key-value state directory.
    #[must_use]
    pub fn state_directory(&self) -> PathBuf {
        self.state_directory
            .as_ref()
            .map_or_else(|| get_data_dir().join("state"), PathBuf::from)
    }
}

/// Handles loading, saving, and validation of user preferences.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe user settings storage.
    settings: RwLock<UserSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl Clone for SettingsManager {
    fn clone(&self) -> Self {
        Self {
            settings: RwLock::new(self.settings.read().clone()),
            config_path: self.config_path.clone(),
        }
    }
}

impl SettingsManager {
    /// Creates a new settings manager with default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path (for testing).
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk or fail
    /// validation.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings: UserSettings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("Using default settings, no file at {:?}", config_path);
            UserSettings::default()
        };
        settings.validate()?;

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Validates, applies and saves new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings are invalid or cannot be saved
    /// to disk. Invalid settings are not applied.
    pub fn update_settings(&self, new_settings: UserSettings) -> Result<(), SettingsError> {
        new_settings.validate()?;
        let mut settings_write = self.settings.write();
        *settings_write = new_settings;
        drop(settings_write);
        self.save_settings()
    }

    fn save_settings(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Path to the settings file.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = xdg_home("XDG_CONFIG_HOME", ".config");
    config_dir.push(APP_DIR);
    config_dir.push("settings.json");
    config_dir
}

/// Per-user data directory holding managed storage and persisted state.
#[must_use]
pub fn get_data_dir() -> PathBuf {
    let mut data_dir = xdg_home("XDG_DATA_HOME", ".local/share");
    data_dir.push(APP_DIR);
    data_dir
}

/// Resolves an XDG base directory from `env_key`, else `$HOME/<fallback>`.
fn xdg_home(env_key: &str, fallback: &str) -> PathBuf {
    if let Ok(dir) = var(env_key)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }

    if let Ok(home) = var("HOME") {
        return PathBuf::from(home).join(fallback);
    }

    // Fallback to current directory if HOME is not set (shouldn't happen on Unix)
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use std::{
        fs::write,
        io::{Error, ErrorKind::NotFound},
        path::PathBuf,
    };

    use {serde_json::from_str, tempfile::TempDir};

    use crate::config::settings::{SettingsError, SettingsManager, UserSettings};

    #[test]
    fn test_user_settings_default() {
        let settings = UserSettings::default();
        assert_eq!(settings.default_extension, "mp3");
        assert_eq!(settings.log_filter, "info");
        assert!(settings.tracks_directory.is_none());
        assert!(settings.fallback_cover_url.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: UserSettings = from_str(r#"{"tracks_directory": "/music/tracks"}"#).unwrap();
        assert_eq!(
            settings.tracks_directory(),
            PathBuf::from("/music/tracks")
        );
        assert_eq!(settings.default_extension, "mp3");
        assert!(settings.state_directory().ends_with("tunedeck/state"));
    }

    #[test]
    fn test_update_settings_round_trips_through_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config/settings.json");
        let manager = SettingsManager::with_config_path(path.clone()).unwrap();
        assert!(!path.exists());

        let updated = UserSettings {
            fallback_cover_url: Some("https://covers.example/default.png".to_string()),
            default_extension: "m4a".to_string(),
            ..UserSettings::default()
        };
        manager.update_settings(updated.clone()).unwrap();

        let reloaded = SettingsManager::with_config_path(path).unwrap();
        assert_eq!(*reloaded.get_settings(), updated);
    }

    #[test]
    fn test_invalid_extension_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let manager = SettingsManager::with_config_path(path.clone()).unwrap();

        let result = manager.update_settings(UserSettings {
            default_extension: ".mp3".to_string(),
            ..UserSettings::default()
        });
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
        assert_eq!(manager.get_settings().default_extension, "mp3");

        write(&path, r#"{"default_extension": ""}"#).unwrap();
        assert!(SettingsManager::with_config_path(path).is_err());
    }

    #[test]
    fn test_settings_error_display() {
        let io_error = Error::new(NotFound, "File not found");
        let settings_error = SettingsError::IoError(io_error);
        assert!(settings_error.to_string().contains("IO error"));

        let invalid_value_error = SettingsError::InvalidValue {
            reason: "test reason".to_string(),
        };
        assert_eq!(
            invalid_value_error.to_string(),
            "Invalid settings value: test reason"
        );
    }
}
