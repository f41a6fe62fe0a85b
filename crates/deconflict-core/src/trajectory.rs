//! Piecewise-linear trajectories reconstructed from mission waypoints.
//!
//! Two views of the same motion are provided: [`position_at`] works directly
//! on absolute timestamps, while [`Trajectory`] converts a mission to seconds
//! relative to a shared reference instant so two missions can be compared on
//! one time axis.

use crate::models::{offset_by_seconds, Mission, Position, TimeWindow};
use chrono::{DateTime, Utc};

/// Interpolated position of `mission` at `t`, or `None` when the drone is not airborne.
///
/// Exact at waypoints. A zero-length segment (duplicate timestamps) yields its
/// first waypoint.
pub fn position_at(mission: &Mission, t: DateTime<Utc>) -> Option<Position> {
    let waypoints = &mission.waypoints;
    let first = waypoints.first()?;
    let last = waypoints.last()?;
    if t < first.timestamp || t > last.timestamp {
        return None;
    }

    let upper = waypoints.partition_point(|wp| wp.timestamp < t);
    let next = waypoints.get(upper)?;
    if next.timestamp == t {
        return Some(next.position);
    }
    let current = waypoints.get(upper.checked_sub(1)?)?;

    let span = seconds_between(current.timestamp, next.timestamp);
    if span <= 0.0 {
        return Some(current.position);
    }

    let ratio = (seconds_between(current.timestamp, t) / span).clamp(0.0, 1.0);
    Some(current.position.lerp(&next.position, ratio))
}

/// Signed seconds from `from` to `to`, microsecond resolution.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Waypoint expressed on a relative time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPoint {
    pub time_s: f64,
    pub position: Position,
}

/// One linear leg between consecutive waypoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub start: Position,
    pub end: Position,
}

impl Segment {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }

    /// Velocity in meters per second; zero for a zero-length leg.
    pub fn velocity(&self) -> Position {
        let span = self.duration_s();
        if span <= 0.0 {
            return Position::default();
        }
        Position::new(
            (self.end.x - self.start.x) / span,
            (self.end.y - self.start.y) / span,
            (self.end.z - self.start.z) / span,
        )
    }

    /// Position on this leg, clamped to its ends.
    pub fn position_at_s(&self, t: f64) -> Position {
        if t <= self.start_s {
            return self.start;
        }
        if t >= self.end_s {
            return self.end;
        }
        let ratio = (t - self.start_s) / self.duration_s();
        self.start.lerp(&self.end, ratio)
    }
}

/// A mission's motion on a time axis shared with other trajectories.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub mission_id: String,
    reference: DateTime<Utc>,
    points: Vec<TimedPoint>,
}

impl Trajectory {
    /// Build the trajectory of `mission` with times measured from `reference`.
    pub fn new(mission: &Mission, reference: DateTime<Utc>) -> Self {
        let points = mission
            .waypoints
            .iter()
            .map(|wp| TimedPoint {
                time_s: seconds_between(reference, wp.timestamp),
                position: wp.position,
            })
            .collect();
        Self {
            mission_id: mission.id.clone(),
            reference,
            points,
        }
    }

    pub fn reference(&self) -> DateTime<Utc> {
        self.reference
    }

    pub fn points(&self) -> &[TimedPoint] {
        &self.points
    }

    /// `(first, last)` waypoint times, `None` for an empty trajectory.
    pub fn covered_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.time_s, self.points.last()?.time_s))
    }

    /// Express an absolute window on this trajectory's time axis.
    pub fn window_s(&self, window: &TimeWindow) -> (f64, f64) {
        (
            seconds_between(self.reference, window.start),
            seconds_between(self.reference, window.end),
        )
    }

    /// Convert a relative time back to an absolute timestamp.
    pub fn to_timestamp(&self, time_s: f64) -> DateTime<Utc> {
        offset_by_seconds(self.reference, time_s)
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points
            .windows(2)
            .enumerate()
            .map(|(index, pair)| Segment {
                index,
                start_s: pair[0].time_s,
                end_s: pair[1].time_s,
                start: pair[0].position,
                end: pair[1].position,
            })
    }

    pub fn position_at_s(&self, t: f64) -> Option<Position> {
        let mut index = 0;
        self.position_with_hint(t, &mut index)
    }

    /// Like [`Trajectory::position_at_s`], resuming the segment search at `index`.
    ///
    /// Monotonically increasing queries walk the waypoint list once in total.
    pub fn position_with_hint(&self, t: f64, index: &mut usize) -> Option<Position> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if t < first.time_s || t > last.time_s {
            return None;
        }

        if *index >= self.points.len() || self.points[*index].time_s >= t {
            *index = 0;
        }
        // Stop before the first point at `t` so duplicates resolve to the earliest one.
        while *index + 1 < self.points.len() && self.points[*index + 1].time_s < t {
            *index += 1;
        }

        let current = &self.points[*index];
        if current.time_s == t {
            return Some(current.position);
        }

        let next = self.points.get(*index + 1)?;
        if next.time_s == t {
            return Some(next.position);
        }
        let span = next.time_s - current.time_s;
        if span <= 0.0 {
            return Some(current.position);
        }

        let ratio = ((t - current.time_s) / span).clamp(0.0, 1.0);
        Some(current.position.lerp(&next.position, ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Waypoint;
    use chrono::{Duration, TimeZone};

    fn t(sec: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(sec)
    }

    fn zigzag() -> Mission {
        Mission::from_waypoints(
            "ZIG",
            vec![
                Waypoint::new(0.1, 0.2, 10.3, t(0)),
                Waypoint::new(10.7, -3.3, 12.9, t(7)),
                Waypoint::new(-4.1, 8.8, 15.0, t(13)),
                Waypoint::new(0.3, 0.3, 0.3, t(29)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_exact_at_every_waypoint() {
        let mission = zigzag();
        let traj = Trajectory::new(&mission, t(-3));
        for wp in &mission.waypoints {
            assert_eq!(position_at(&mission, wp.timestamp), Some(wp.position));
            let rel = seconds_between(t(-3), wp.timestamp);
            assert_eq!(traj.position_at_s(rel), Some(wp.position));
        }
    }

    #[test]
    fn test_absent_outside_coverage() {
        let mission = zigzag();
        assert_eq!(position_at(&mission, t(-1)), None);
        assert_eq!(position_at(&mission, t(30)), None);

        let traj = Trajectory::new(&mission, t(0));
        assert_eq!(traj.position_at_s(-0.001), None);
        assert_eq!(traj.position_at_s(29.001), None);
    }

    #[test]
    fn test_interpolation_is_proportional_within_segment() {
        let mission = Mission::from_waypoints(
            "LINE",
            vec![
                Waypoint::new(0.0, 0.0, 10.0, t(0)),
                Waypoint::new(10.0, 20.0, 30.0, t(10)),
            ],
        )
        .unwrap();

        for step in 1..10 {
            let p = position_at(&mission, t(step)).unwrap();
            let ratio = step as f64 / 10.0;
            assert!((p.x - 10.0 * ratio).abs() < 1e-9);
            assert!((p.y - 20.0 * ratio).abs() < 1e-9);
            assert!((p.z - (10.0 + 20.0 * ratio)).abs() < 1e-9);
        }

        let quarter = position_at(&mission, t(2) + Duration::milliseconds(500)).unwrap();
        assert!((quarter.x - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_timestamp_returns_first_waypoint() {
        // Bypasses validation on purpose: the interpolator must not divide by zero.
        let mission = Mission {
            id: "DUP".into(),
            name: "DUP".into(),
            start: t(0),
            end: t(10),
            waypoints: vec![
                Waypoint::new(0.0, 0.0, 0.0, t(0)),
                Waypoint::new(5.0, 5.0, 5.0, t(5)),
                Waypoint::new(9.0, 9.0, 9.0, t(5)),
                Waypoint::new(10.0, 10.0, 10.0, t(10)),
            ],
        };
        assert_eq!(
            position_at(&mission, t(5)),
            Some(Position::new(5.0, 5.0, 5.0))
        );
        let p = position_at(&mission, t(4)).unwrap();
        assert!(p.x.is_finite());

        let traj = Trajectory::new(&mission, t(0));
        for start in 0..4 {
            let mut hint = start;
            assert_eq!(
                traj.position_with_hint(5.0, &mut hint),
                Some(Position::new(5.0, 5.0, 5.0)),
                "hint {start}"
            );
        }
        assert_eq!(traj.position_at_s(5.0), Some(Position::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_hinted_lookup_matches_fresh_lookup() {
        let mission = zigzag();
        let traj = Trajectory::new(&mission, t(0));
        let mut hint = 0;
        let mut s = 0.0;
        while s <= 29.0 {
            assert_eq!(traj.position_with_hint(s, &mut hint), traj.position_at_s(s));
            s += 0.37;
        }
        // Going backwards resets the hint instead of returning stale data.
        assert_eq!(traj.position_with_hint(1.0, &mut hint), traj.position_at_s(1.0));
    }

    #[test]
    fn test_segments_expose_velocity() {
        let mission = zigzag();
        let traj = Trajectory::new(&mission, t(0));
        let segments: Vec<_> = traj.segments().collect();
        assert_eq!(segments.len(), 3);
        let v = segments[0].velocity();
        assert!((v.x - 10.6 / 7.0).abs() < 1e-12);
        assert_eq!(segments[2].position_at_s(29.0), Position::new(0.3, 0.3, 0.3));
    }
}
