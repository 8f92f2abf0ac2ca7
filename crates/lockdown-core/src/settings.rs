//! Tool settings
//!
//! Stores non-sensitive defaults (key size, key file naming, default store)
//! in a plain JSON file. Missing files and missing fields fall back to
//! defaults.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crypto::{validate_bits, DEFAULT_KEY_BITS};
use crate::error::{LockdownError, Result};
use crate::storage::write_atomic;

const SETTINGS_FILE: &str = "settings.json";

/// Settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// RSA modulus size for generated key pairs
    pub key_bits: usize,
    /// File name of a generated private key; the public key adds `public_key_suffix`
    pub key_base_name: String,
    pub public_key_suffix: String,
    /// Credential store used when none is given on the command line
    pub default_store: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            key_bits: DEFAULT_KEY_BITS,
            key_base_name: "lockdown_rsa".to_string(),
            public_key_suffix: ".pub".to_string(),
            default_store: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        validate_bits(self.key_bits)?;

        if self.key_base_name.trim().is_empty() {
            return Err(LockdownError::Validation(
                "Key base name must not be empty".to_string(),
            ));
        }
        if self.key_base_name.contains(['/', '\\']) {
            return Err(LockdownError::Validation(format!(
                "Key base name must be a plain file name (got {})",
                self.key_base_name
            )));
        }

        Ok(())
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Load settings from `config_dir`, falling back to defaults if absent
    pub fn new(config_dir: &Path) -> Result<Self> {
        let settings_file = config_dir.join(SETTINGS_FILE);
        let settings = Self::load_from_file(&settings_file)?;

        Ok(Self {
            settings_file,
            settings,
        })
    }

    /// Load settings from the platform config directory
    pub fn from_default_dir() -> Result<Self> {
        Self::new(&Self::default_dir()?)
    }

    /// Platform config directory for lockdown
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("org", "starchartlabs", "lockdown")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| LockdownError::Settings("Could not determine config directory".to_string()))
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| LockdownError::Settings(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;

        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file, creating the config directory if needed
    pub fn save(&self) -> Result<()> {
        self.settings.validate()?;

        let contents = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| LockdownError::Settings(e.to_string()))?;

        if let Some(dir) = self.settings_file.parent() {
            std::fs::create_dir_all(dir)?;
        }
        write_atomic(&self.settings_file, contents.as_bytes())?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable settings
    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }
}
