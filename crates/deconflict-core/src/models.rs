//! Core data models for mission deconfliction.

use crate::error::MissionError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point in the shared local frame (meters).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean 3D distance.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Linear blend towards `other`; `ratio` 0 returns `self` unchanged.
    pub fn lerp(&self, other: &Position, ratio: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * ratio,
            y: self.y + (other.y - self.y) * ratio,
            z: self.z + (other.z - self.z) * ratio,
        }
    }

    pub fn midpoint(&self, other: &Position) -> Position {
        Position {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A timestamped 3D waypoint of a validated mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(flatten)]
    pub position: Position,
    pub timestamp: DateTime<Utc>,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            position: Position::new(x, y, z),
            timestamp,
        }
    }
}

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration_s(&self) -> f64 {
        crate::trajectory::seconds_between(self.start, self.end)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Common part of both windows. Touching windows intersect in a single instant.
    pub fn intersection(&self, other: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(TimeWindow { start, end })
    }

    /// Interval separating two disjoint windows, `None` if they intersect.
    pub fn gap_to(&self, other: &TimeWindow) -> Option<TimeWindow> {
        if self.end < other.start {
            Some(TimeWindow::new(self.end, other.start))
        } else if other.end < self.start {
            Some(TimeWindow::new(other.end, self.start))
        } else {
            None
        }
    }
}

/// A drone's planned flight, validated and immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub waypoints: Vec<Waypoint>,
}

impl Mission {
    /// Build and validate a mission with an explicit time window.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        waypoints: Vec<Waypoint>,
    ) -> Result<Self, MissionError> {
        let mission = Self {
            id: id.into(),
            name: name.into(),
            start,
            end,
            waypoints,
        };
        mission.validate()?;
        Ok(mission)
    }

    /// Build a mission whose window is exactly its waypoint coverage.
    pub fn from_waypoints(
        id: impl Into<String>,
        waypoints: Vec<Waypoint>,
    ) -> Result<Self, MissionError> {
        let id = id.into();
        let (start, end) = match (waypoints.first(), waypoints.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => {
                return Err(MissionError::TooFewWaypoints {
                    mission_id: id,
                    count: waypoints.len(),
                })
            }
        };
        Self::new(id.clone(), id, start, end, waypoints)
    }

    /// Convert the loosely-shaped external form into a validated mission.
    pub fn from_request(request: MissionRequest) -> Result<Self, MissionError> {
        let waypoints: Vec<Waypoint> = request
            .waypoints
            .iter()
            .map(|wp| Waypoint::new(wp.x, wp.y, wp.z, wp.timestamp))
            .collect();

        let first = waypoints.first().map(|wp| wp.timestamp);
        let last = waypoints.last().map(|wp| wp.timestamp);
        let (Some(first), Some(last)) = (first, last) else {
            return Err(MissionError::TooFewWaypoints {
                mission_id: request.id,
                count: 0,
            });
        };

        let name = request.name.unwrap_or_else(|| request.id.clone());
        Self::new(
            request.id,
            name,
            request.start.unwrap_or(first),
            request.end.unwrap_or(last),
            waypoints,
        )
    }

    /// Check structural invariants. The detector refuses to analyse a mission that fails.
    pub fn validate(&self) -> Result<(), MissionError> {
        if self.waypoints.len() < 2 {
            return Err(MissionError::TooFewWaypoints {
                mission_id: self.id.clone(),
                count: self.waypoints.len(),
            });
        }

        if self.end < self.start {
            return Err(MissionError::InvalidWindow {
                mission_id: self.id.clone(),
                start: self.start,
                end: self.end,
            });
        }

        for (index, wp) in self.waypoints.iter().enumerate() {
            if !wp.position.is_finite() {
                return Err(MissionError::NonFiniteCoordinate {
                    mission_id: self.id.clone(),
                    index,
                });
            }
        }

        for (index, pair) in self.waypoints.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(MissionError::NonMonotonicTimestamps {
                    mission_id: self.id.clone(),
                    index: index + 1,
                    timestamp: pair[1].timestamp,
                });
            }
        }

        // Monotonic, so only the endpoints can escape the window.
        let last_index = self.waypoints.len() - 1;
        for index in [0, last_index] {
            let timestamp = self.waypoints[index].timestamp;
            if timestamp < self.start || timestamp > self.end {
                return Err(MissionError::WaypointOutsideWindow {
                    mission_id: self.id.clone(),
                    index,
                    timestamp,
                    start: self.start,
                    end: self.end,
                });
            }
        }

        Ok(())
    }

    /// Declared `[start, end]` window.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// Range actually covered by waypoints, where the trajectory is defined.
    pub fn covered_window(&self) -> TimeWindow {
        match (self.waypoints.first(), self.waypoints.last()) {
            (Some(first), Some(last)) => TimeWindow::new(first.timestamp, last.timestamp),
            _ => self.window(),
        }
    }

    /// Total flight time in seconds across the covered window.
    pub fn duration_s(&self) -> f64 {
        self.covered_window().duration_s()
    }
}

/// External mission shape as produced by a loader, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRequest {
    #[serde(alias = "drone_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub end: Option<DateTime<Utc>>,
    pub waypoints: Vec<WaypointRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointRequest {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
}

/// Lenient timestamp parsing: RFC 3339, or a naive ISO-8601 value taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|raw| {
            parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
        })
        .transpose()
    }
}

// ========== CONFLICT OUTPUT ==========

/// Classification of a reported conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Within the safety radius at a simultaneous instant
    Spatial,
    /// Windows overlap (or nearly touch) without a separation violation
    Temporal,
    /// Separation violation inside a confirmed temporal overlap
    Both,
    /// Flight paths come within the radius, passed at different instants
    Path,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spatial => "spatial",
            Self::Temporal => "temporal",
            Self::Both => "both",
            Self::Path => "path",
        }
    }
}

/// One reported conflict between the primary mission and another mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub other_id: String,
    pub kind: ConflictKind,
    /// Instant of closest approach (start of the gap for a near-miss advisory,
    /// the primary's passage for a path record)
    pub time: DateTime<Utc>,
    /// When the other drone passes its closest point, for path records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_time: Option<DateTime<Utc>>,
    /// Violation run, temporal overlap, or near-miss gap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    /// Midpoint between the two drones at `time`
    pub location: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_location: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_location: Option<Position>,
    pub distance_m: f64,
    pub radius_m: f64,
    /// Gap between the two windows, or between the two passages of a path record
    #[serde(default)]
    pub time_gap_s: f64,
    /// Leg indices (waypoint `i` to `i + 1`) of the closest points, for path records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_segment: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_segment: Option<usize>,
}

impl ConflictRecord {
    pub fn is_separation_violation(&self) -> bool {
        matches!(self.kind, ConflictKind::Spatial | ConflictKind::Both)
    }
}

/// Ordered conflicts for one primary-vs-others run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub primary_id: String,
    pub records: Vec<ConflictRecord>,
}

impl ConflictReport {
    /// Build a report, sorting by time, then other mission id, then kind.
    pub fn new(primary_id: impl Into<String>, mut records: Vec<ConflictRecord>) -> Self {
        records.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.other_id.cmp(&b.other_id))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        Self {
            primary_id: primary_id.into(),
            records,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.records.iter()
    }

    pub fn count_by_kind(&self) -> BTreeMap<ConflictKind, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Records involving one other mission, in report order.
    pub fn for_mission<'a>(&'a self, other_id: &'a str) -> impl Iterator<Item = &'a ConflictRecord> {
        self.records.iter().filter(move |r| r.other_id == other_id)
    }

    /// Smallest separation reported, if any.
    pub fn min_distance_m(&self) -> Option<f64> {
        self.records
            .iter()
            .filter(|r| r.is_separation_violation())
            .map(|r| r.distance_m)
            .reduce(f64::min)
    }
}

/// Shift `t` by fractional seconds at microsecond resolution.
pub(crate) fn offset_by_seconds(t: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    t + Duration::microseconds((seconds * 1_000_000.0).round() as i64)
}
