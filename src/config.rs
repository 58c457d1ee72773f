use chrono::Duration;
use serde_derive::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::error::Error;

/// Parameters of the lifecycle state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive unmatched frames tolerated before eviction.
    pub memory_tolerance: u32,
    /// Width in pixels of the border band that forces immediate eviction.
    pub border_margin: i32,
    /// Seconds an evicted carrier stays eligible for resurrection.
    pub history_duration: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            memory_tolerance: 15,
            border_margin: 100,
            history_duration: 10.0,
        }
    }
}

impl TrackerConfig {
    /// Negative and non-finite durations mean no retention at all.
    pub fn history_retention(&self) -> Duration {
        let ms = (self.history_duration * 1000.0).round();
        if !ms.is_finite() || ms <= 0.0 {
            return Duration::zero();
        }

        // chrono caps durations at i64::MAX milliseconds
        Duration::milliseconds(ms.min(i64::MAX as f64) as i64)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.history_duration.is_finite() || self.history_duration < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "history_duration must be a non-negative number of seconds, got {}",
                self.history_duration
            )));
        }

        if self.border_margin < 0 {
            return Err(Error::InvalidConfig(format!(
                "border_margin must not be negative, got {}",
                self.border_margin
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    /// Where the live snapshot is written every frame.
    pub snapshot_path: PathBuf,
    pub database_path: PathBuf,
    /// Seconds between two movement log entries.
    pub movement_log_interval: f64,
    /// Seconds the acquisition loop waits for a frame.
    pub frame_timeout: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            snapshot_path: PathBuf::from("active_carriers.json"),
            database_path: PathBuf::from("carriers.db"),
            movement_log_interval: 5.0,
            frame_timeout: 2.0,
        }
    }
}

impl Config {
    /// Reads the config from a JSON file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.tracker.validate()?;

        for (name, secs) in [
            ("movement_log_interval", self.movement_log_interval),
            ("frame_timeout", self.frame_timeout),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, secs
                )));
            }
        }

        Ok(())
    }
}
