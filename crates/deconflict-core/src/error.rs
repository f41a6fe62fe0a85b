//! Error types for mission validation and detector configuration.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A mission failed one of its structural invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error("mission {mission_id}: needs at least 2 waypoints, got {count}")]
    TooFewWaypoints { mission_id: String, count: usize },

    #[error(
        "mission {mission_id}: waypoint {index} at {timestamp} is not after the previous waypoint"
    )]
    NonMonotonicTimestamps {
        mission_id: String,
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("mission {mission_id}: end {end} is before start {start}")]
    InvalidWindow {
        mission_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("mission {mission_id}: waypoint {index} at {timestamp} falls outside [{start}, {end}]")]
    WaypointOutsideWindow {
        mission_id: String,
        index: usize,
        timestamp: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("mission {mission_id}: waypoint {index} has a non-finite coordinate")]
    NonFiniteCoordinate { mission_id: String, index: usize },

    #[error("mission id {mission_id} appears more than once")]
    DuplicateMissionId { mission_id: String },
}

impl MissionError {
    /// Id of the mission that failed validation.
    pub fn mission_id(&self) -> &str {
        match self {
            Self::TooFewWaypoints { mission_id, .. }
            | Self::NonMonotonicTimestamps { mission_id, .. }
            | Self::InvalidWindow { mission_id, .. }
            | Self::WaypointOutsideWindow { mission_id, .. }
            | Self::NonFiniteCoordinate { mission_id, .. }
            | Self::DuplicateMissionId { mission_id } => mission_id,
        }
    }
}

/// Detection parameters that would make the analysis meaningless or non-terminating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample step must be positive, got {0}")]
    NonPositiveSampleStep(f64),

    #[error("time threshold must be non-negative, got {0}")]
    NegativeTimeThreshold(f64),

    #[error("path time window must be non-negative, got {0}")]
    NegativePathTimeWindow(f64),

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error(
        "sample step {step_s} s needs {samples} samples between {primary_id} and {other_id} (limit {limit})"
    )]
    SampleBudgetExceeded {
        primary_id: String,
        other_id: String,
        step_s: f64,
        samples: f64,
        limit: u64,
    },
}

/// Anything that stops a detection run before analysis starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error(transparent)]
    Mission(#[from] MissionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
