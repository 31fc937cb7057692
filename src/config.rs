//! Analysis configuration
//!
//! All tunables (bitmap resolution, awake-run tolerance, merge gap, trend
//! thresholds) live in one immutable [`AnalysisConfig`] that is passed
//! explicitly into the segmentation, merging and classification entry points.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default number of sleep-bitmap buckets per hour (30 minute resolution)
pub const DEFAULT_BUCKETS_PER_HOUR: u32 = 2;

/// Default number of awake buckets tolerated inside the night cluster
pub const DEFAULT_MAX_AWAKE_RUN: usize = 3;

/// Default gap below which consecutive intervals are merged (seconds)
pub const DEFAULT_MERGE_GAP_SECS: i64 = 60;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub segmentation: SegmentationConfig,
    pub merge: MergeConfig,
    pub trend: TrendConfig,
}

/// Day/night segmentation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Bitmap buckets per hour; must divide 3600
    pub buckets_per_hour: u32,
    /// Longest awake run (in buckets) that does not break the night
    pub max_awake_run: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            buckets_per_hour: DEFAULT_BUCKETS_PER_HOUR,
            max_awake_run: DEFAULT_MAX_AWAKE_RUN,
        }
    }
}

/// Interval merger tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Intervals closer than this are merged (seconds)
    pub max_gap_secs: i64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: DEFAULT_MERGE_GAP_SECS,
        }
    }
}

/// Monthly trend classifier tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Standard deviations above/below the mean for a red signal
    pub std_upper: f64,
    /// Standard deviations above/below the mean for a sustained yellow signal
    pub std_lower: f64,
    /// Consecutive recent days beyond `std_upper` required for red
    pub red_run: usize,
    /// Consecutive recent days beyond `std_lower` required for yellow
    pub yellow_run: usize,
    /// Event count at which a counter turns red
    pub count_threshold: u32,
    /// Number of most recent days summed for counters
    pub count_window_days: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            std_upper: 2.0,
            std_lower: 1.0,
            red_run: 2,
            yellow_run: 3,
            count_threshold: 5,
            count_window_days: 10,
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check that every tunable is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.segmentation.validate()?;
        self.merge.validate()?;
        self.trend.validate()
    }
}

impl SegmentationConfig {
    /// Length of one bitmap bucket in seconds
    pub fn bucket_secs(&self) -> i64 {
        3600 / i64::from(self.buckets_per_hour)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets_per_hour == 0 || 3600 % self.buckets_per_hour != 0 {
            return Err(ConfigError::Invalid(format!(
                "buckets_per_hour must divide 3600, got {}",
                self.buckets_per_hour
            )));
        }
        if self.max_awake_run >= 24 * self.buckets_per_hour as usize {
            return Err(ConfigError::Invalid(format!(
                "max_awake_run ({}) must be shorter than one day of buckets",
                self.max_awake_run
            )));
        }
        Ok(())
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_gap_secs < 0 {
            return Err(ConfigError::Invalid("max_gap_secs must be >= 0".to_string()));
        }
        Ok(())
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.std_lower > 0.0 && self.std_upper >= self.std_lower) {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy 0 < std_lower <= std_upper, got {} / {}",
                self.std_lower, self.std_upper
            )));
        }
        if self.red_run == 0 || self.yellow_run == 0 {
            return Err(ConfigError::Invalid("run lengths must be at least 1".to_string()));
        }
        if self.count_threshold == 0 || self.count_window_days == 0 {
            return Err(ConfigError::Invalid(
                "count_threshold and count_window_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    Io(String),

    #[error("Cannot parse configuration: {0}")]
    Parse(String),

    #[error("{0}")]
    Invalid(String),
}
