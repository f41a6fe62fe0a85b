//! Strategic deconfliction of planned drone missions.
//!
//! Reconstructs each mission's motion from its timestamped waypoints and
//! reports where and when a primary mission comes within the safety radius of
//! any other mission. An optional path pass also flags routes that come
//! within the radius at different times.

pub mod conflict;
pub mod error;
pub mod models;
pub mod path;
pub mod rules;
pub mod spatial;
pub mod temporal;
pub mod trajectory;

pub use conflict::{detect, ConflictDetector};
pub use error::{ConfigError, DetectionError, MissionError};
pub use models::{
    ConflictKind, ConflictRecord, ConflictReport, Mission, MissionRequest, Position, TimeWindow,
    Waypoint, WaypointRequest,
};
pub use path::{find_path_proximity, PathAnalyzer, PathProximity};
pub use rules::{DetectionConfig, OverlapMode, SpatialMethod, TemporalStrategy};
pub use spatial::{
    find_spatial_conflicts, ClosestApproach, SpatialAnalyzer, SpatialEvent, MAX_SAMPLES_PER_PAIR,
};
pub use temporal::{find_temporal_overlap, OverlapKind, TemporalAnalyzer, TemporalOverlap};
pub use trajectory::{position_at, Trajectory};
