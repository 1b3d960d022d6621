use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::geometry::Observer;

/// Upper bound for every `*_secs` setting
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Top-level tracker configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub observer: ObserverConfig,
    pub tracking: TrackingLimits,
    pub display: DisplayLimits,
    pub feed: FeedConfig,
    pub device: DeviceConfig,
    pub dashboard: DashboardConfig,
    pub events: EventsConfig,
}

/// Camera position. Defaults to the null island placeholder and must be
/// set for real use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Camera height above sea level in meters
    pub altitude_m: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude_m: 30.0,
        }
    }
}

impl ObserverConfig {
    pub fn observer(&self) -> Observer {
        Observer {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude_m: self.altitude_m,
        }
    }
}

/// Eligibility limits for a tracking candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingLimits {
    pub max_distance_km: f64,
    pub max_altitude_ft: f64,
    pub max_fix_age_secs: f64,
}

impl Default for TrackingLimits {
    fn default() -> Self {
        Self {
            max_distance_km: 9.0,
            max_altitude_ft: 9000.0,
            max_fix_age_secs: 10.0,
        }
    }
}

/// Limits for the informational nearby-traffic list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayLimits {
    pub max_distance_km: f64,
    pub max_altitude_ft: f64,
    pub max_fix_age_secs: f64,
    pub max_entries: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            max_distance_km: 50.0,
            max_altitude_ft: 30000.0,
            max_fix_age_secs: 60.0,
            max_entries: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Full URL of the `aircraft.json` document
    pub url: String,
    pub timeout_secs: f64,
    /// Pause between polls while a target is held
    pub poll_interval_secs: f64,
    /// Back-off after a failed cycle
    pub retry_delay_secs: f64,
    /// Pause between polls while nothing is eligible
    pub idle_delay_secs: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "http://192.168.100.2:8080/aircraft.json".to_string(),
            timeout_secs: 5.0,
            poll_interval_secs: 0.2,
            retry_delay_secs: 1.0,
            idle_delay_secs: 1.0,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.idle_delay_secs)
    }
}

/// Serial pointing device and mount limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Minimum spacing between two pointing commands
    pub send_interval_secs: f64,
    pub pan_max: f64,
    pub tilt_max: f64,
    /// Neutral position commanded once after connecting
    pub home_pan: f64,
    pub home_tilt: f64,
    /// Wait after opening the port before the home command
    pub homing_delay_secs: f64,
    /// Wait after the home command before tracking starts
    pub settle_delay_secs: f64,
    /// Exit instead of running status-only when the port cannot be opened
    pub required: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            send_interval_secs: 0.8,
            pan_max: 340.0,
            tilt_max: 90.0,
            home_pan: 200.0,
            home_tilt: 0.0,
            homing_delay_secs: 10.0,
            settle_delay_secs: 5.0,
            required: false,
        }
    }
}

impl DeviceConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_secs_f64(self.send_interval_secs)
    }

    pub fn homing_delay(&self) -> Duration {
        Duration::from_secs_f64(self.homing_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.settle_delay_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub interface: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// File that exists while a target is locked, for external recorders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_file: Option<PathBuf>,
}

impl TrackerConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: TrackerConfig =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        Ok(config)
    }

    /// Load from an explicit path, or from the resolved default path if
    /// present, falling back to built-in defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let path = config_path();
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::load(&path)
        } else {
            warn!(
                "No configuration file at {}, using built-in defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Reject values that would make the tracker misbehave
    pub fn validate(&self) -> Result<()> {
        let obs = &self.observer;
        if !(-90.0..=90.0).contains(&obs.latitude) {
            bail!("observer.latitude {} is outside [-90, 90]", obs.latitude);
        }
        if !(-180.0..=180.0).contains(&obs.longitude) {
            bail!("observer.longitude {} is outside [-180, 180]", obs.longitude);
        }

        let positive = [
            ("tracking.max_distance_km", self.tracking.max_distance_km),
            ("tracking.max_fix_age_secs", self.tracking.max_fix_age_secs),
            ("display.max_distance_km", self.display.max_distance_km),
            ("display.max_fix_age_secs", self.display.max_fix_age_secs),
            ("device.pan_max", self.device.pan_max),
            ("device.tilt_max", self.device.tilt_max),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                bail!("{} must be a positive number, got {}", name, value);
            }
        }

        if !(self.feed.timeout_secs > 0.0 && self.feed.timeout_secs <= MAX_DURATION_SECS) {
            bail!(
                "feed.timeout_secs must be in (0, {}], got {}",
                MAX_DURATION_SECS,
                self.feed.timeout_secs
            );
        }

        let durations = [
            ("feed.poll_interval_secs", self.feed.poll_interval_secs),
            ("feed.retry_delay_secs", self.feed.retry_delay_secs),
            ("feed.idle_delay_secs", self.feed.idle_delay_secs),
            ("device.send_interval_secs", self.device.send_interval_secs),
            ("device.homing_delay_secs", self.device.homing_delay_secs),
            ("device.settle_delay_secs", self.device.settle_delay_secs),
        ];
        for (name, value) in durations {
            if !(0.0..=MAX_DURATION_SECS).contains(&value) {
                bail!(
                    "{} must be in [0, {}], got {}",
                    name,
                    MAX_DURATION_SECS,
                    value
                );
            }
        }

        if self.device.tilt_max > 90.0 {
            bail!(
                "device.tilt_max {} is past vertical (max 90)",
                self.device.tilt_max
            );
        }
        if self.display.max_entries == 0 {
            bail!("display.max_entries must be at least 1");
        }
        if self.feed.url.is_empty() {
            bail!("feed.url must be set");
        }

        Ok(())
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `SKYTRACK_CONFIG` env var
/// 2. `./skytrack.toml`
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("SKYTRACK_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("./skytrack.toml")
}
