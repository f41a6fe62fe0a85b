//! Detection parameters and strategy selection.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SAFETY_RADIUS_M: f64 = 10.0;
pub const DEFAULT_TIME_THRESHOLD_S: f64 = 2.0;
pub const DEFAULT_SAMPLE_STEP_S: f64 = 1.0;

/// How temporal relevance is decided for a pair of missions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalStrategy {
    /// Separate temporal pass gates the pair; violations inside it are tagged `both`
    #[default]
    Split,
    /// Spatial pass alone decides; its overlap window stands in for the temporal check
    Folded,
}

/// How minimum separation is searched within the overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialMethod {
    /// Closed-form closest approach per pair of linear segments
    #[default]
    Analytic,
    /// Fixed-step sampling of both trajectories
    Sampled,
}

/// Which time range of each mission takes part in the overlap computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapMode {
    /// Declared `[start, end]` windows
    Window,
    /// First-to-last waypoint range, where both trajectories are defined
    #[default]
    Coverage,
}

/// Configuration for a detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum 3D separation in meters; non-positive disables the spatial check
    #[serde(alias = "safety_radius", default = "default_safety_radius")]
    pub safety_radius_m: f64,
    /// Largest window gap in seconds still flagged as a temporal near-miss
    #[serde(alias = "time_threshold", default = "default_time_threshold")]
    pub time_threshold_s: f64,
    /// Sampling interval in seconds for [`SpatialMethod::Sampled`]
    #[serde(alias = "sample_step", default = "default_sample_step")]
    pub sample_step_s: f64,
    #[serde(default)]
    pub strategy: TemporalStrategy,
    #[serde(default)]
    pub method: SpatialMethod,
    #[serde(default)]
    pub overlap: OverlapMode,
    /// Report overlapping windows without a separation violation as `temporal`
    #[serde(default)]
    pub temporal_advisories: bool,
    /// Also compare the flown paths geometrically and report non-simultaneous passages
    #[serde(default)]
    pub path_proximity: bool,
    /// Largest passage gap in seconds reported by the path pass; unlimited when absent
    #[serde(
        alias = "path_time_window",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub path_time_window_s: Option<f64>,
}

fn default_safety_radius() -> f64 {
    DEFAULT_SAFETY_RADIUS_M
}

fn default_time_threshold() -> f64 {
    DEFAULT_TIME_THRESHOLD_S
}

fn default_sample_step() -> f64 {
    DEFAULT_SAMPLE_STEP_S
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            safety_radius_m: DEFAULT_SAFETY_RADIUS_M,
            time_threshold_s: DEFAULT_TIME_THRESHOLD_S,
            sample_step_s: DEFAULT_SAMPLE_STEP_S,
            strategy: TemporalStrategy::default(),
            method: SpatialMethod::default(),
            overlap: OverlapMode::default(),
            temporal_advisories: false,
            path_proximity: false,
            path_time_window_s: None,
        }
    }
}

impl DetectionConfig {
    pub fn new(safety_radius_m: f64, time_threshold_s: f64) -> Self {
        Self {
            safety_radius_m,
            time_threshold_s,
            ..Self::default()
        }
    }

    pub fn with_sample_step(mut self, sample_step_s: f64) -> Self {
        self.sample_step_s = sample_step_s;
        self
    }

    pub fn with_strategy(mut self, strategy: TemporalStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_method(mut self, method: SpatialMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapMode) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_temporal_advisories(mut self, enabled: bool) -> Self {
        self.temporal_advisories = enabled;
        self
    }

    /// Enable the path pass, optionally limited to passages at most `max_gap_s` apart.
    pub fn with_path_proximity(mut self, max_gap_s: Option<f64>) -> Self {
        self.path_proximity = true;
        self.path_time_window_s = max_gap_s;
        self
    }

    /// Reject values that cannot produce a terminating, meaningful run.
    ///
    /// The sample step is checked even for the analytic method so a config
    /// stays valid when the method is switched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.safety_radius_m.is_nan() {
            return Err(ConfigError::NonFinite {
                field: "safety_radius_m",
            });
        }
        if !self.time_threshold_s.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "time_threshold_s",
            });
        }
        if self.time_threshold_s < 0.0 {
            return Err(ConfigError::NegativeTimeThreshold(self.time_threshold_s));
        }
        if self.sample_step_s.is_nan() || self.sample_step_s <= 0.0 {
            return Err(ConfigError::NonPositiveSampleStep(self.sample_step_s));
        }
        if !self.sample_step_s.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "sample_step_s",
            });
        }
        if let Some(gap) = self.path_time_window_s {
            if !gap.is_finite() {
                return Err(ConfigError::NonFinite {
                    field: "path_time_window_s",
                });
            }
            if gap < 0.0 {
                return Err(ConfigError::NegativePathTimeWindow(gap));
            }
        }
        Ok(())
    }

    /// Whether any spatial conflict can be reported at all.
    pub fn spatial_enabled(&self) -> bool {
        self.safety_radius_m > 0.0
    }
}
