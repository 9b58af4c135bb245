// SPDX-License-Identifier: MIT

//! Configuration module for the updater
//!
//! `UpdateConfig` is the persisted, user-editable part (the launcher's
//! `config.json`). `UpdaterOptions` holds runtime wiring that never hits disk.

use crate::error::{Result, UpdateError};
use crate::platform::{Arch, Platform};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_DIR_NAME: &str = "ku-launcher";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Launcher settings as stored in `config.json`.
///
/// Reading is lenient: a field that is missing or has the wrong type takes
/// its default, and keys owned by other parts of the launcher are kept in
/// `extra` so a save never drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct UpdateConfig {
    /// Download and install new releases without asking
    pub auto_update: bool,

    /// Skip scheduled checks entirely (manual checks still work)
    pub disable_update_check: bool,

    /// Recurring check interval in milliseconds
    pub check_interval: u64,

    pub last_check_time: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            auto_update: false,
            disable_update_check: false,
            check_interval: DEFAULT_CHECK_INTERVAL_MS,
            last_check_time: None,
            extra: Map::new(),
        }
    }
}

/// Remove `key` and parse it, `None` when absent or malformed
fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(field = key, %value, error = %e, "Ignoring malformed config field");
            None
        }
    }
}

/// RFC 3339 string, or epoch milliseconds as written by `Date.now()`
fn take_timestamp(map: &mut Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match map.remove(key)? {
        Value::Null => None,
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .inspect_err(|e| tracing::warn!(field = key, value = %s, error = %e, "Ignoring malformed timestamp"))
            .ok(),
        other => {
            tracing::warn!(field = key, value = %other, "Ignoring malformed timestamp");
            None
        }
    }
}

impl From<Map<String, Value>> for UpdateConfig {
    fn from(mut map: Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            auto_update: take_field(&mut map, "autoUpdate").unwrap_or(defaults.auto_update),
            disable_update_check: take_field(&mut map, "disableUpdateCheck")
                .unwrap_or(defaults.disable_update_check),
            check_interval: take_field(&mut map, "checkInterval").unwrap_or(defaults.check_interval),
            last_check_time: take_timestamp(&mut map, "lastCheckTime"),
            extra: map,
        }
    }
}

impl UpdateConfig {
    /// Zero would spin the scheduler, so it falls back to the default
    pub fn check_interval_duration(&self) -> Duration {
        if self.check_interval == 0 {
            Duration::from_millis(DEFAULT_CHECK_INTERVAL_MS)
        } else {
            Duration::from_millis(self.check_interval)
        }
    }
}

/// Reads and writes `UpdateConfig` at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<OS config dir>/ku-launcher/config.json`
    pub fn default_location() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            UpdateError::Config("Unable to determine the user config directory".to_owned())
        })?;
        Ok(Self::new(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, falling back to defaults when the file is missing or unreadable
    pub fn load(&self) -> UpdateConfig {
        match self.try_load() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "Failed to load config, using defaults");
                UpdateConfig::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<UpdateConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "Config file not found, using defaults");
            return Ok(UpdateConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| UpdateError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn save(&self, config: &UpdateConfig) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let content = serde_json::to_string_pretty(config)?;

        // Atomic write
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Load, apply `change`, save. Returns the saved config.
    ///
    /// A file that is not a JSON object is left untouched and reported as an error.
    pub fn update(&self, change: impl FnOnce(&mut UpdateConfig)) -> Result<UpdateConfig> {
        let mut config = self.try_load()?;
        change(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}

/// Runtime wiring for the updater; none of this is persisted
#[derive(Debug, Clone)]
pub struct UpdaterOptions {
    pub repo_owner: String,
    pub repo_name: String,
    /// Overrides the GitHub API host (tests, mirrors)
    pub api_base_url: Option<String>,
    pub current_version: String,
    /// Delay before the first scheduled check after startup
    pub startup_delay: Duration,
    /// Time the OS gets to start the installer before we quit
    pub quit_grace: Duration,
    pub download_dir: PathBuf,
    /// Longest pause between two reads of the installer body
    pub download_idle_timeout: Option<Duration>,
    /// `None` on operating systems without published installers
    pub platform: Option<Platform>,
    pub detected_arch: Arch,
}

impl Default for UpdaterOptions {
    fn default() -> Self {
        Self {
            repo_owner: "BBIYAKYEE7".to_owned(),
            repo_name: "Korea-University-Launcher".to_owned(),
            api_base_url: None,
            current_version: env!("CARGO_PKG_VERSION").to_owned(),
            startup_delay: Duration::from_secs(30),
            quit_grace: Duration::from_secs(2),
            download_dir: std::env::temp_dir(),
            download_idle_timeout: Some(Duration::from_secs(crate::downloader::IDLE_TIMEOUT_SECS)),
            platform: Platform::current(),
            detected_arch: Arch::current(),
        }
    }
}
