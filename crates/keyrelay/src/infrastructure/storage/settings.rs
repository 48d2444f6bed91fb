//! JSON-based settings persistence.
//!
//! Reads and writes [`Settings`] to a JSON file, by default in the
//! platform-appropriate config directory:
//! - Windows:  `%APPDATA%\KeyRelay\settings.json`
//! - Linux:    `~/.config/keyrelay/settings.json`
//! - macOS:    `~/Library/Application Support/KeyRelay/settings.json`
//!
//! # File format
//!
//! ```json
//! {
//!   "LastUsedIPAddress": "192.168.1.10",
//!   "KeyMappings": {
//!     "a": "z",
//!     "b": "y"
//!   }
//! }
//! ```
//!
//! Both fields are optional when reading, so a first run (no file) and a
//! partially written file both load as defaults.  Mapping entries whose key
//! or value is not exactly one character are skipped by the translator on
//! load.  They stay in the file until the next remap, which rewrites
//! `KeyMappings` from the translator and so drops them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::manage_settings::SettingsRepository;

/// File name of the settings file inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The JSON content could not be parsed.
    #[error("failed to parse settings JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The settings could not be serialized to JSON.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Settings stored on disk between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// The host address most recently joined as a client.
    #[serde(rename = "LastUsedIPAddress", default)]
    pub last_used_ip_address: Option<String>,

    /// Substitution table as persisted: one-character strings on both sides.
    #[serde(rename = "KeyMappings", default, deserialize_with = "null_as_default")]
    pub key_mappings: BTreeMap<String, String>,
}

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Settings repository ───────────────────────────────────────────────────────

/// [`SettingsRepository`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Creates a store reading and writing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at [`default_settings_path`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NoPlatformConfigDir`] if the base directory
    /// cannot be determined.
    pub fn at_default_location() -> Result<Self, SettingsError> {
        Ok(Self::new(default_settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsRepository for JsonSettingsStore {
    /// Loads settings, returning `Settings::default()` if the file does not
    /// exist yet.
    fn load(&self) -> Result<Settings, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let settings: Settings =
                    serde_json::from_str(&content).map_err(SettingsError::Parse)?;
                debug!("settings loaded from {}", self.path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no settings at {}; using defaults", self.path.display());
                Ok(Settings::default())
            }
            Err(source) => Err(SettingsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes settings, creating the parent directory when needed.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;
        std::fs::write(&self.path, content).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Resolves the full path of the settings file in the platform config dir.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] if the base directory cannot
/// be determined from the environment.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    platform_config_dir()
        .map(|dir| dir.join(SETTINGS_FILE_NAME))
        .ok_or(SettingsError::NoPlatformConfigDir)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KeyRelay"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("keyrelay"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("KeyRelay"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
