//! Scheduler configuration file support.
//!
//! Every setting has a default, so an empty file (or no file at all) yields the
//! standard Elginfield setup.
//!
//! ```toml
//! [site]
//! latitude_deg = 43.1925
//! longitude_deg = -81.3158
//!
//! [limits]
//! elevation_limit_deg = 10.0
//! min_moon_offset_deg = 15.0
//!
//! [store]
//! path = "colibri_user_observations.csv"
//!
//! [slew]
//! max_attempts = 10
//! backoff_secs = 5
//! ```

use qtty::Degrees;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::astro::SiteLocation;
use crate::hardware::RetryPolicy;
use crate::models::{ObservingLimits, DEFAULT_ELEVATION_LIMIT_DEG, DEFAULT_MIN_MOON_OFFSET_DEG};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "COLIBRI_CONFIG";
/// File looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "colibri.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub site: SiteSettings,
    pub limits: LimitSettings,
    pub store: StoreSettings,
    pub timing: TimingSettings,
    pub slew: SlewSettings,
    pub execution: ExecutionSettings,
}

/// Observatory location. Longitude is east-positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_latitude")]
    pub latitude_deg: f64,
    #[serde(default = "default_longitude")]
    pub longitude_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_elevation_limit")]
    pub elevation_limit_deg: f64,
    #[serde(default = "default_min_moon_offset")]
    pub min_moon_offset_deg: f64,
    /// Lowest altitude the mount may ever be commanded to.
    #[serde(default = "default_elevation_limit")]
    pub safety_floor_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Loop waits, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Wait after a pass that found nothing to observe.
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff_secs: u64,
    /// Wait while the weather is unsafe.
    #[serde(default = "default_idle_backoff")]
    pub weather_backoff_secs: u64,
    /// Wait before retrying an unavailable store.
    #[serde(default = "default_store_retry")]
    pub store_retry_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlewSettings {
    #[serde(default = "default_slew_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_slew_backoff")]
    pub backoff_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Observing time between two recalibrations.
    #[serde(default = "default_recalibration_interval")]
    pub recalibration_interval_min: f64,
    #[serde(default = "default_dark_frames")]
    pub dark_frames: u32,
    /// Added to the exposure time to bound each exposure.
    #[serde(default = "default_exposure_timeout_margin")]
    pub exposure_timeout_margin_secs: u64,
    /// Images land in `<data_root>/<yyyymmdd>/<directoryName>`.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

fn default_latitude() -> f64 {
    43.1925
}

fn default_longitude() -> f64 {
    -81.3158
}

fn default_elevation_limit() -> f64 {
    DEFAULT_ELEVATION_LIMIT_DEG
}

fn default_min_moon_offset() -> f64 {
    DEFAULT_MIN_MOON_OFFSET_DEG
}

fn default_store_path() -> PathBuf {
    PathBuf::from("colibri_user_observations.csv")
}

fn default_idle_backoff() -> u64 {
    300
}

fn default_store_retry() -> u64 {
    60
}

fn default_slew_attempts() -> u32 {
    10
}

fn default_slew_backoff() -> u64 {
    5
}

fn default_recalibration_interval() -> f64 {
    30.0
}

fn default_dark_frames() -> u32 {
    10
}

fn default_exposure_timeout_margin() -> u64 {
    120
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            latitude_deg: default_latitude(),
            longitude_deg: default_longitude(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            elevation_limit_deg: default_elevation_limit(),
            min_moon_offset_deg: default_min_moon_offset(),
            safety_floor_deg: default_elevation_limit(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            idle_backoff_secs: default_idle_backoff(),
            weather_backoff_secs: default_idle_backoff(),
            store_retry_secs: default_store_retry(),
        }
    }
}

impl Default for SlewSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_slew_attempts(),
            backoff_secs: default_slew_backoff(),
        }
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            recalibration_interval_min: default_recalibration_interval(),
            dark_frames: default_dark_frames(),
            exposure_timeout_margin_secs: default_exposure_timeout_margin(),
            data_root: default_data_root(),
        }
    }
}

impl FromStr for SchedulerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SchedulerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl SchedulerConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Resolve the configuration to use.
    ///
    /// Looks at, in order: `explicit`, the file named by `COLIBRI_CONFIG`, and
    /// `colibri.toml` in the working directory. Falls back to the defaults
    /// when none of them is given or present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Self::from_file(path.trim());
            }
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        log::info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Reject settings that cannot describe a working observatory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(-90.0..=90.0).contains(&self.site.latitude_deg) {
            return invalid(format!("site.latitude_deg {} is outside [-90, 90]", self.site.latitude_deg));
        }
        if !(-180.0..=360.0).contains(&self.site.longitude_deg) {
            return invalid(format!("site.longitude_deg {} is outside [-180, 360]", self.site.longitude_deg));
        }
        for (name, value) in [
            ("limits.elevation_limit_deg", self.limits.elevation_limit_deg),
            ("limits.safety_floor_deg", self.limits.safety_floor_deg),
        ] {
            if !(-90.0..90.0).contains(&value) {
                return invalid(format!("{} {} is outside [-90, 90)", name, value));
            }
        }
        if !(0.0..180.0).contains(&self.limits.min_moon_offset_deg) {
            return invalid(format!(
                "limits.min_moon_offset_deg {} is outside [0, 180)",
                self.limits.min_moon_offset_deg
            ));
        }
        if self.slew.max_attempts == 0 {
            return invalid("slew.max_attempts must be at least 1".to_string());
        }
        if self.timing.idle_backoff_secs == 0
            || self.timing.weather_backoff_secs == 0
            || self.timing.store_retry_secs == 0
        {
            return invalid("timing backoffs must be positive".to_string());
        }
        let interval = self.execution.recalibration_interval_min;
        if !interval.is_finite() || interval <= 0.0 {
            return invalid(format!(
                "execution.recalibration_interval_min {} must be positive",
                interval
            ));
        }
        if self.store.path.as_os_str().is_empty() {
            return invalid("store.path is empty".to_string());
        }
        Ok(())
    }

    pub fn site(&self) -> SiteLocation {
        SiteLocation::new(
            Degrees::new(self.site.latitude_deg),
            Degrees::new(self.site.longitude_deg),
        )
    }

    pub fn limits(&self) -> ObservingLimits {
        ObservingLimits {
            elevation_limit: Degrees::new(self.limits.elevation_limit_deg),
            min_moon_offset: Degrees::new(self.limits.min_moon_offset_deg),
        }
    }

    pub fn safety_floor(&self) -> Degrees {
        Degrees::new(self.limits.safety_floor_deg)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.slew.max_attempts,
            backoff: Duration::from_secs(self.slew.backoff_secs),
        }
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_secs(self.timing.idle_backoff_secs)
    }

    pub fn weather_backoff(&self) -> Duration {
        Duration::from_secs(self.timing.weather_backoff_secs)
    }

    pub fn store_retry(&self) -> Duration {
        Duration::from_secs(self.timing.store_retry_secs)
    }

    pub fn exposure_timeout_margin(&self) -> Duration {
        Duration::from_secs(self.execution.exposure_timeout_margin_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: SchedulerConfig = "".parse().unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.limits(), ObservingLimits::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.idle_backoff(), Duration::from_secs(300));
        assert_eq!(config.execution.dark_frames, 10);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = r#"
[site]
latitude_deg = -30.24

[limits]
elevation_limit_deg = 20.0

[slew]
max_attempts = 3
"#;
        let config: SchedulerConfig = toml.parse().unwrap();
        assert_eq!(config.site.latitude_deg, -30.24);
        assert_eq!(config.site.longitude_deg, default_longitude());
        assert_eq!(config.limits.elevation_limit_deg, 20.0);
        assert_eq!(config.limits.min_moon_offset_deg, 15.0);
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.retry_policy().backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_validation_rejects_impossible_values() {
        assert!(matches!(
            "[site]\nlatitude_deg = 91.0\n".parse::<SchedulerConfig>(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            "[slew]\nmax_attempts = 0\n".parse::<SchedulerConfig>(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            "[execution]\nrecalibration_interval_min = 0.0\n".parse::<SchedulerConfig>(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            "[site\n".parse::<SchedulerConfig>(),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colibri.toml");
        fs::write(&path, "[store]\npath = \"/srv/colibri/requests.csv\"\n").unwrap();

        let config = SchedulerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/srv/colibri/requests.csv"));

        let missing = SchedulerConfig::from_file(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
