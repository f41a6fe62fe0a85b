//! Detection configuration from environment and optional JSON file.
//!
//! Layers apply in order: built-in defaults, `DECONFLICT_*` variables, the
//! config file, then command-line flags. Each layer only replaces the values
//! it names.

use anyhow::{Context, Result};
use deconflict_core::rules::{
    DEFAULT_SAFETY_RADIUS_M, DEFAULT_SAMPLE_STEP_S, DEFAULT_TIME_THRESHOLD_S,
};
use deconflict_core::{DetectionConfig, OverlapMode, SpatialMethod, TemporalStrategy};
use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub safety_radius_m: f64,
    pub time_threshold_s: f64,
    pub sample_step_s: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safety_radius_m: DEFAULT_SAFETY_RADIUS_M,
            time_threshold_s: DEFAULT_TIME_THRESHOLD_S,
            sample_step_s: DEFAULT_SAMPLE_STEP_S,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: f64| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };
        Self {
            safety_radius_m: read("DECONFLICT_RADIUS_M", DEFAULT_SAFETY_RADIUS_M),
            time_threshold_s: read("DECONFLICT_TIME_THRESHOLD_S", DEFAULT_TIME_THRESHOLD_S),
            sample_step_s: read("DECONFLICT_SAMPLE_STEP_S", DEFAULT_SAMPLE_STEP_S),
        }
    }

    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig::new(self.safety_radius_m, self.time_threshold_s)
            .with_sample_step(self.sample_step_s)
    }
}

/// Partial detection config as written in a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(alias = "safety_radius")]
    pub safety_radius_m: Option<f64>,
    #[serde(alias = "time_threshold")]
    pub time_threshold_s: Option<f64>,
    #[serde(alias = "sample_step")]
    pub sample_step_s: Option<f64>,
    pub strategy: Option<TemporalStrategy>,
    pub method: Option<SpatialMethod>,
    pub overlap: Option<OverlapMode>,
    pub temporal_advisories: Option<bool>,
    pub path_proximity: Option<bool>,
    #[serde(alias = "path_time_window")]
    pub path_time_window_s: Option<f64>,
}

impl ConfigFile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Overlay the values present in the file onto `base`.
    pub fn apply(&self, mut base: DetectionConfig) -> DetectionConfig {
        if let Some(radius) = self.safety_radius_m {
            base.safety_radius_m = radius;
        }
        if let Some(threshold) = self.time_threshold_s {
            base.time_threshold_s = threshold;
        }
        if let Some(step) = self.sample_step_s {
            base.sample_step_s = step;
        }
        if let Some(strategy) = self.strategy {
            base.strategy = strategy;
        }
        if let Some(method) = self.method {
            base.method = method;
        }
        if let Some(overlap) = self.overlap {
            base.overlap = overlap;
        }
        if let Some(advisories) = self.temporal_advisories {
            base.temporal_advisories = advisories;
        }
        if let Some(path) = self.path_proximity {
            base.path_proximity = path;
        }
        if self.path_time_window_s.is_some() {
            base.path_time_window_s = self.path_time_window_s;
        }
        base
    }
}

/// Environment-derived config with `path` layered on top.
pub fn load_detection_config(path: &Path) -> Result<DetectionConfig> {
    Ok(ConfigFile::load(path)?.apply(Config::from_env().detection_config()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_overrides_and_fallbacks() {
        let vars: HashMap<&str, &str> = [
            ("DECONFLICT_RADIUS_M", "25"),
            ("DECONFLICT_TIME_THRESHOLD_S", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.safety_radius_m, 25.0);
        assert_eq!(config.time_threshold_s, DEFAULT_TIME_THRESHOLD_S);
        assert_eq!(config.sample_step_s, DEFAULT_SAMPLE_STEP_S);

        let detection = config.detection_config();
        assert_eq!(detection.safety_radius_m, 25.0);
        assert!(detection.validate().is_ok());
    }

    #[test]
    fn test_file_overlays_environment() {
        let vars: HashMap<&str, &str> = [("DECONFLICT_RADIUS_M", "25")].into_iter().collect();
        let base = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).detection_config();

        let file = ConfigFile::from_json(r#"{"time_threshold": 3, "method": "sampled"}"#).unwrap();
        let config = file.apply(base);
        assert_eq!(config.safety_radius_m, 25.0);
        assert_eq!(config.time_threshold_s, 3.0);
        assert_eq!(config.method, SpatialMethod::Sampled);
        assert_eq!(config.sample_step_s, DEFAULT_SAMPLE_STEP_S);
        assert!(!config.path_proximity);
    }

    #[test]
    fn test_file_path_settings_and_unknown_keys() {
        let file =
            ConfigFile::from_json(r#"{"path_proximity": true, "path_time_window": 30}"#).unwrap();
        let config = file.apply(DetectionConfig::default());
        assert!(config.path_proximity);
        assert_eq!(config.path_time_window_s, Some(30.0));

        assert!(ConfigFile::from_json(r#"{"safety_radus": 5}"#).is_err());
    }
}
