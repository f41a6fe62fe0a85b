//! Geometric proximity of two flight paths, regardless of when they are flown.
//!
//! A drone that crosses a point a few seconds after another one left it is
//! never within the radius at a single instant, so the separation check stays
//! silent. This pass compares the paths themselves: for every pair of legs it
//! finds the closest points of the two 3D segments and reports how far apart
//! in time the drones pass them.

use crate::models::{Mission, Position};
use crate::rules::DetectionConfig;
use crate::trajectory::{Segment, Trajectory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Squared leg length below which a leg is treated as a hover (m²).
const DEGENERATE_EPS: f64 = 1e-12;
/// Passages closer in time than this are simultaneous (seconds).
const SIMULTANEOUS_EPS_S: f64 = 1e-9;

/// Closest points of one primary leg and one other leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathProximity {
    pub primary_segment: usize,
    pub other_segment: usize,
    pub primary_point: Position,
    pub other_point: Position,
    pub distance_m: f64,
    /// When the primary drone passes `primary_point`
    pub primary_time: DateTime<Utc>,
    /// When the other drone passes `other_point`
    pub other_time: DateTime<Utc>,
    pub time_gap_s: f64,
}

/// Every leg pair whose paths come within `radius_m`, at any time gap.
pub fn find_path_proximity(a: &Mission, b: &Mission, radius_m: f64) -> Vec<PathProximity> {
    PathAnalyzer::new(radius_m).analyze(a, b)
}

#[derive(Debug, Clone, Copy)]
pub struct PathAnalyzer {
    pub radius_m: f64,
    /// Largest passage gap still reported; `None` reports every gap
    pub max_time_gap_s: Option<f64>,
}

impl PathAnalyzer {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            max_time_gap_s: None,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.safety_radius_m).with_max_time_gap(config.path_time_window_s)
    }

    pub fn with_max_time_gap(mut self, max_time_gap_s: Option<f64>) -> Self {
        self.max_time_gap_s = max_time_gap_s;
        self
    }

    /// Non-simultaneous passages within the radius, ordered by primary passage time.
    ///
    /// Passages flown at the same instant are left to the separation check,
    /// which already reports them.
    pub fn analyze(&self, a: &Mission, b: &Mission) -> Vec<PathProximity> {
        if self.radius_m.is_nan() || self.radius_m <= 0.0 {
            return Vec::new();
        }

        let reference = a.start.min(b.start);
        let primary = Trajectory::new(a, reference);
        let other = Trajectory::new(b, reference);
        let other_segments: Vec<Segment> = other.segments().collect();

        let mut hits: Vec<(f64, f64, PathProximity)> = Vec::new();
        for sa in primary.segments() {
            for sb in &other_segments {
                let passage = closest_passage(&sa, sb);
                let distance_m = passage.primary.distance_to(&passage.other);
                if distance_m > self.radius_m {
                    continue;
                }
                let time_gap_s = (passage.other_s - passage.primary_s).abs();
                if time_gap_s <= SIMULTANEOUS_EPS_S {
                    continue;
                }
                if self.max_time_gap_s.is_some_and(|max| time_gap_s > max) {
                    continue;
                }
                hits.push((
                    passage.primary_s,
                    passage.other_s,
                    PathProximity {
                        primary_segment: sa.index,
                        other_segment: sb.index,
                        primary_point: passage.primary,
                        other_point: passage.other,
                        distance_m,
                        primary_time: primary.to_timestamp(passage.primary_s),
                        other_time: other.to_timestamp(passage.other_s),
                        time_gap_s,
                    },
                ));
            }
        }

        hits.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.total_cmp(&y.1)));
        // Legs sharing a waypoint report the same passage twice.
        hits.dedup_by(|next, kept| {
            (next.0 - kept.0).abs() <= SIMULTANEOUS_EPS_S
                && (next.1 - kept.1).abs() <= SIMULTANEOUS_EPS_S
        });

        tracing::trace!(primary = %a.id, other = %b.id, hits = hits.len(), "path proximity");
        hits.into_iter().map(|(_, _, hit)| hit).collect()
    }
}

/// Closest points of two legs and the relative times at which each is passed.
#[derive(Debug, Clone, Copy)]
struct Passage {
    primary: Position,
    other: Position,
    primary_s: f64,
    other_s: f64,
}

fn sub(p: &Position, q: &Position) -> Position {
    Position::new(p.x - q.x, p.y - q.y, p.z - q.z)
}

fn dot(p: &Position, q: &Position) -> f64 {
    p.x * q.x + p.y * q.y + p.z * q.z
}

fn closest_passage(a: &Segment, b: &Segment) -> Passage {
    let da = sub(&a.end, &a.start);
    let db = sub(&b.end, &b.start);
    let len_a = dot(&da, &da);
    let len_b = dot(&db, &db);
    let (s, u) = closest_parameters(a, b);

    let time_on = |segment: &Segment, ratio: f64| segment.start_s + ratio * segment.duration_s();
    let (primary_s, other_s) = match (len_a <= DEGENERATE_EPS, len_b <= DEGENERATE_EPS) {
        (false, false) => (time_on(a, s), time_on(b, u)),
        // A hover occupies its point for the whole leg; pick the instant nearest the other pass.
        (true, false) => {
            let other_s = time_on(b, u);
            (other_s.clamp(a.start_s, a.end_s), other_s)
        }
        (false, true) => {
            let primary_s = time_on(a, s);
            (primary_s, primary_s.clamp(b.start_s, b.end_s))
        }
        (true, true) => {
            let shared = a.start_s.max(b.start_s);
            if shared <= a.end_s.min(b.end_s) {
                (shared, shared)
            } else if a.end_s < b.start_s {
                (a.end_s, b.start_s)
            } else {
                (a.start_s, b.end_s)
            }
        }
    };

    Passage {
        primary: a.start.lerp(&a.end, s),
        other: b.start.lerp(&b.end, u),
        primary_s,
        other_s,
    }
}

/// Parameters in `[0, 1]` of the closest points on legs `a` and `b`.
fn closest_parameters(a: &Segment, b: &Segment) -> (f64, f64) {
    let da = sub(&a.end, &a.start);
    let db = sub(&b.end, &b.start);
    let r = sub(&a.start, &b.start);
    let len_a = dot(&da, &da);
    let len_b = dot(&db, &db);
    let f = dot(&db, &r);

    if len_a <= DEGENERATE_EPS && len_b <= DEGENERATE_EPS {
        return (0.0, 0.0);
    }
    if len_a <= DEGENERATE_EPS {
        return (0.0, (f / len_b).clamp(0.0, 1.0));
    }
    let c = dot(&da, &r);
    if len_b <= DEGENERATE_EPS {
        return ((-c / len_a).clamp(0.0, 1.0), 0.0);
    }

    let cross = dot(&da, &db);
    let denom = len_a * len_b - cross * cross;
    // Parallel legs: any point works, start from the primary's first end.
    let s = if denom > DEGENERATE_EPS {
        ((cross * f - c * len_b) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let u = (cross * s + f) / len_b;
    if u < 0.0 {
        ((-c / len_a).clamp(0.0, 1.0), 0.0)
    } else if u > 1.0 {
        (((cross - c) / len_a).clamp(0.0, 1.0), 1.0)
    } else {
        (s, u)
    }
}
