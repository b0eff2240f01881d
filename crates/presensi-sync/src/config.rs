//! # Client Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRESENSI_API_URL=https://hr.example.id/api                         │
//! │     PRESENSI_OFFICE_LAT / _LNG / _RADIUS                               │
//! │     PRESENSI_MAX_RETRIES, PRESENSI_DB_PATH                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/presensi/presensi.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │                                                                         │
//! │  The office geofence saved in the settings table overrides [office]    │
//! │  once the engine is running (see `AttendanceSyncEngine::reconfigure`). │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://hr.example.id/api"
//! timeout_secs = 15
//!
//! [office]
//! latitude = -7.037943980089189
//! longitude = 110.47993371532893
//! radius_meters = 500.0
//!
//! [geo]
//! max_attempts = 4
//! target_accuracy_m = 50.0
//!
//! [sync]
//! max_retries = 3
//! min_drain_interval_ms = 3000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use presensi_core::{
    OfficeGeofence, DEFAULT_ATTENDANCE_STATUS, DEFAULT_MAX_RETRIES, DEFAULT_OFFICE_LATITUDE,
    DEFAULT_OFFICE_LONGITUDE, DEFAULT_OFFICE_RADIUS_M,
};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// API Settings
// =============================================================================

/// REST backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Office Settings
// =============================================================================

/// Fallback office geofence used until one is saved in settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeSettings {
    #[serde(default = "default_office_lat")]
    pub latitude: f64,

    #[serde(default = "default_office_lng")]
    pub longitude: f64,

    #[serde(default = "default_office_radius")]
    pub radius_meters: f64,
}

fn default_office_lat() -> f64 {
    DEFAULT_OFFICE_LATITUDE
}

fn default_office_lng() -> f64 {
    DEFAULT_OFFICE_LONGITUDE
}

fn default_office_radius() -> f64 {
    DEFAULT_OFFICE_RADIUS_M
}

impl Default for OfficeSettings {
    fn default() -> Self {
        OfficeSettings {
            latitude: default_office_lat(),
            longitude: default_office_lng(),
            radius_meters: default_office_radius(),
        }
    }
}

impl OfficeSettings {
    pub fn geofence(&self) -> OfficeGeofence {
        OfficeGeofence::new(self.latitude, self.longitude, self.radius_meters)
    }
}

// =============================================================================
// Geo Settings
// =============================================================================

/// Location acquisition and accuracy gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSettings {
    /// Sensor reads per acquisition.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// A reading at or below this accuracy ends acquisition early (meters).
    #[serde(default = "default_target_accuracy")]
    pub target_accuracy_m: f64,

    /// Readings worse than this are queued instead of submitted (meters).
    #[serde(default = "default_max_acceptable_accuracy")]
    pub max_acceptable_accuracy_m: f64,

    /// Timeout for a single sensor read (seconds).
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Pause after a reading that missed the accuracy target (milliseconds).
    #[serde(default = "default_inaccurate_delay")]
    pub inaccurate_delay_ms: u64,

    /// Pause after a failed read (milliseconds).
    #[serde(default = "default_failure_delay")]
    pub failure_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}
fn default_target_accuracy() -> f64 {
    50.0
}
fn default_max_acceptable_accuracy() -> f64 {
    2000.0
}
fn default_attempt_timeout() -> u64 {
    15
}
fn default_inaccurate_delay() -> u64 {
    500
}
fn default_failure_delay() -> u64 {
    300
}

impl Default for GeoSettings {
    fn default() -> Self {
        GeoSettings {
            max_attempts: default_max_attempts(),
            target_accuracy_m: default_target_accuracy(),
            max_acceptable_accuracy_m: default_max_acceptable_accuracy(),
            attempt_timeout_secs: default_attempt_timeout(),
            inaccurate_delay_ms: default_inaccurate_delay(),
            failure_delay_ms: default_failure_delay(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Queue drain behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Entries that failed this many uploads are abandoned.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Minimum spacing between two drains (milliseconds).
    #[serde(default = "default_min_drain_interval")]
    pub min_drain_interval_ms: u64,

    /// Pause after each successful upload (milliseconds).
    #[serde(default = "default_inter_entry_pause")]
    pub inter_entry_pause_ms: u64,

    /// Backoff grows by this much per retry (milliseconds).
    #[serde(default = "default_backoff_step")]
    pub backoff_step_ms: u64,

    /// Backoff ceiling (milliseconds).
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_ms: u64,

    /// Delay between a reconnect event and the drain it triggers (milliseconds).
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Delay between queuing an entry and the drain it schedules (milliseconds).
    #[serde(default = "default_queue_drain_delay")]
    pub queue_drain_delay_ms: u64,

    /// Background drain interval (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Status label sent when the caller gives none.
    #[serde(default = "default_status")]
    pub default_status: String,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_min_drain_interval() -> u64 {
    3000
}
fn default_inter_entry_pause() -> u64 {
    200
}
fn default_backoff_step() -> u64 {
    2000
}
fn default_backoff_cap() -> u64 {
    10_000
}
fn default_reconnect_delay() -> u64 {
    200
}
fn default_queue_drain_delay() -> u64 {
    300
}
fn default_poll_interval() -> u64 {
    60
}
fn default_status() -> String {
    DEFAULT_ATTENDANCE_STATUS.to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_retries: default_max_retries(),
            min_drain_interval_ms: default_min_drain_interval(),
            inter_entry_pause_ms: default_inter_entry_pause(),
            backoff_step_ms: default_backoff_step(),
            backoff_cap_ms: default_backoff_cap(),
            reconnect_delay_ms: default_reconnect_delay(),
            queue_drain_delay_ms: default_queue_drain_delay(),
            poll_interval_secs: default_poll_interval(),
            default_status: default_status(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub office: OfficeSettings,

    #[serde(default)]
    pub geo: GeoSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (presensi.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        presensi_core::validation::validate_geofence(&self.office.geofence())
            .map_err(|e| SyncError::InvalidConfig(format!("office: {e}")))?;

        if self.geo.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "geo.max_attempts must be greater than 0".into(),
            ));
        }

        if self.sync.backoff_cap_ms < self.sync.backoff_step_ms {
            return Err(SyncError::InvalidConfig(
                "sync.backoff_cap_ms must not be below sync.backoff_step_ms".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `PRESENSI_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key = %key, value = %raw, "Ignoring unparseable environment override");
                    None
                }
            }
        }

        if let Some(url) = lookup("PRESENSI_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }
        if let Some(lat) = parsed("PRESENSI_OFFICE_LAT", lookup("PRESENSI_OFFICE_LAT")) {
            self.office.latitude = lat;
        }
        if let Some(lng) = parsed("PRESENSI_OFFICE_LNG", lookup("PRESENSI_OFFICE_LNG")) {
            self.office.longitude = lng;
        }
        if let Some(radius) = parsed("PRESENSI_OFFICE_RADIUS", lookup("PRESENSI_OFFICE_RADIUS")) {
            self.office.radius_meters = radius;
        }
        if let Some(max) = parsed("PRESENSI_MAX_RETRIES", lookup("PRESENSI_MAX_RETRIES")) {
            self.sync.max_retries = max;
        }
        if let Some(path) = lookup("PRESENSI_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("id", "presensi", "presensi")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("presensi.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Configured database path, or `presensi.db` in the platform data dir,
    /// or the working directory as a last resort.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|d| d.data_dir().join("presensi.db")))
            .unwrap_or_else(|| PathBuf::from("presensi.db"))
    }

    pub fn office_geofence(&self) -> OfficeGeofence {
        self.office.geofence()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.api.timeout(), Duration::from_secs(15));
        assert_eq!(config.office_geofence(), OfficeGeofence::default());
        assert_eq!(config.geo.max_attempts, 4);
        assert_eq!(config.geo.max_acceptable_accuracy_m, 2000.0);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.min_drain_interval_ms, 3000);
        assert_eq!(config.sync.default_status, "Present");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();
        config.api.base_url = "ftp://example.id".into();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.office.radius_meters = 0.0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.geo.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://hr.example.id/api"

            [sync]
            max_retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://hr.example.id/api");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.sync.max_retries, 5);
        assert_eq!(config.sync.backoff_step_ms, 2000);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PRESENSI_API_URL", "https://hr.example.id/api"),
            ("PRESENSI_OFFICE_RADIUS", "250"),
            ("PRESENSI_MAX_RETRIES", "not-a-number"),
            ("PRESENSI_DB_PATH", "/tmp/p.db"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://hr.example.id/api");
        assert_eq!(config.office.radius_meters, 250.0);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/p.db"));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[office]"));
        assert!(toml_str.contains("[sync]"));
    }
}
