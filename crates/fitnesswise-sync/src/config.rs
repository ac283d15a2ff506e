//! # Tracker Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FITNESSWISE_API_URL=https://api.example.com/api                    │
//! │     FITNESSWISE_DB_PATH=/data/fitnesswise.db                           │
//! │     FITNESSWISE_AUTOSAVE_SECS=30                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tracker/tracker.toml (Linux)                             │
//! │     ~/Library/Application Support/app.fitnesswise.tracker (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [remote]
//! base_url = "http://localhost:5000/api"
//! request_timeout_secs = 10
//!
//! [autosave]
//! interval_secs = 30
//! saved_display_secs = 2
//! retry_poll_ms = 1000
//!
//! [retry]
//! base_delay_secs = 5
//! max_attempts = 3
//!
//! [storage]
//! database_path = "/var/lib/fitnesswise/tracker.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote Settings
// =============================================================================

/// Where the REST API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Base URL including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout. This is the only bound on a remote call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Auto-Save Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSaveSettings {
    /// Seconds between auto-save ticks.
    #[serde(default = "default_autosave_interval")]
    pub interval_secs: u64,

    /// How long "Saved" stays up before reverting to "Ready".
    #[serde(default = "default_saved_display")]
    pub saved_display_secs: u64,

    /// How often the retry queue is checked for due entries.
    #[serde(default = "default_retry_poll")]
    pub retry_poll_ms: u64,
}

fn default_autosave_interval() -> u64 {
    30
}

fn default_saved_display() -> u64 {
    2
}

fn default_retry_poll() -> u64 {
    1000
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        AutoSaveSettings {
            interval_secs: default_autosave_interval(),
            saved_display_secs: default_saved_display(),
            retry_poll_ms: default_retry_poll(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Retry schedule for failed upserts.
///
/// ```text
/// attempt:   1      2      3
/// delay:     5s     10s    20s     (base × 2^retryCount)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Attempts per queued snapshot before it is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            base_delay_secs: default_base_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to `tracker.db` in the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Tracker Configuration
// =============================================================================

/// Complete client-side configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub autosave: AutoSaveSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tracker.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading tracker config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load tracker config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Tracker config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.remote.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.remote.base_url
            )));
        }

        if self.remote.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.autosave.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "autosave interval_secs must be greater than 0".into(),
            ));
        }
        if self.autosave.retry_poll_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "retry_poll_ms must be greater than 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides from `lookup`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("FITNESSWISE_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.remote.base_url = url;
        }

        if let Some(path) = lookup("FITNESSWISE_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = lookup("FITNESSWISE_AUTOSAVE_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => {
                    debug!(secs = s, "Overriding auto-save interval from environment");
                    self.autosave.interval_secs = s;
                }
                Err(_) => warn!(value = %secs, "Ignoring non-numeric FITNESSWISE_AUTOSAVE_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("tracker.toml"))
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("app", "fitnesswise", "tracker")
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The SQLite file to open.
    pub fn database_path(&self) -> SyncResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Self::project_dirs()
                .map(|dirs| dirs.data_dir().join("tracker.db"))
                .ok_or_else(|| {
                    SyncError::InvalidConfig("No database path and no home directory".into())
                }),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }

    /// Scheduler timings derived from this config.
    pub fn autosave_options(&self) -> AutoSaveOptions {
        AutoSaveOptions {
            interval: Duration::from_secs(self.autosave.interval_secs),
            saved_display: Duration::from_secs(self.autosave.saved_display_secs),
            retry_poll: Duration::from_millis(self.autosave.retry_poll_ms),
            retry_base_delay: Duration::from_secs(self.retry.base_delay_secs),
            max_attempts: self.retry.max_attempts,
        }
    }
}

/// Timings the [`crate::autosave::AutoSaver`] runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveOptions {
    pub interval: Duration,
    pub saved_display: Duration,
    pub retry_poll: Duration,
    pub retry_base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        TrackerConfig::default().autosave_options()
    }
}
