//! Configuration
//!
//! Loaded from TOML. Every section has defaults so a partial file (or none
//! at all) gives the stock behavior with the embedded zone catalog.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::{
    CatalogError, ScoreThresholds, Zone, ZoneCatalog, DEFAULT_COUNTDOWN_SECS,
    DEFAULT_FALLBACK_LAT, DEFAULT_FALLBACK_LNG, DEFAULT_LOW_SCORE_THRESHOLD,
};

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid zone catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Scoring and escalation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Seconds between a restricted-zone entry and escalation
    pub countdown_secs: u32,
    /// Score below which a low safety score alert is raised
    pub low_score_threshold: u8,
    pub thresholds: ScoreThresholds,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD,
            thresholds: ScoreThresholds::default(),
        }
    }
}

/// Position sensor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Interval between sensor samples in milliseconds
    pub interval_ms: u64,
    /// How long the sensor may go without a fix before reporting a timeout
    pub timeout_ms: u64,
    /// Delay after a timeout before the fallback coordinate is applied
    pub fallback_delay_ms: u64,
    pub fallback_lat: f64,
    pub fallback_lng: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            timeout_ms: 15_000,
            fallback_delay_ms: 5_000,
            fallback_lat: DEFAULT_FALLBACK_LAT,
            fallback_lng: DEFAULT_FALLBACK_LNG,
        }
    }
}

/// Event broadcast settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Maximum queued events; the oldest is dropped when full
    pub queue_capacity: usize,
    /// Base URL for the webhook sink, if any
    pub webhook_url: Option<String>,
    /// Per-request timeout for the webhook sink
    pub request_timeout_secs: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            webhook_url: None,
            request_timeout_secs: 5,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavisafeConfig {
    pub tracking: TrackingConfig,
    pub sensor: SensorConfig,
    pub broadcast: BroadcastConfig,
    /// Custom zones; empty means the embedded catalog
    pub zones: Vec<Zone>,
}

impl NavisafeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build the zone catalog this configuration describes
    pub fn catalog(&self) -> Result<ZoneCatalog, ConfigError> {
        let catalog = if self.zones.is_empty() {
            ZoneCatalog::embedded()?
        } else {
            ZoneCatalog::new(self.zones.clone())?
        };
        Ok(catalog)
    }
}
