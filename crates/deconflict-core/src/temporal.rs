//! Temporal overlap between missions, independent of geometry.

use crate::models::{Mission, TimeWindow};
use crate::rules::OverlapMode;
use crate::trajectory::{Segment, Trajectory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapKind {
    /// Windows share at least one instant
    Direct,
    /// Disjoint, but separated by no more than the time threshold
    NearMiss,
}

/// Result of comparing two missions' time windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalOverlap {
    pub kind: OverlapKind,
    /// The shared interval for `Direct`, the gap for `NearMiss`
    pub window: TimeWindow,
    pub gap_s: f64,
}

impl TemporalOverlap {
    pub fn is_direct(&self) -> bool {
        self.kind == OverlapKind::Direct
    }
}

/// Overlap of the declared `[start, end]` windows of `a` and `b`.
///
/// Returns `None` when the windows are disjoint by more than `time_threshold_s`.
pub fn find_temporal_overlap(
    a: &Mission,
    b: &Mission,
    time_threshold_s: f64,
) -> Option<TemporalOverlap> {
    TemporalAnalyzer::new(time_threshold_s).find_overlap(a, b)
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalAnalyzer {
    pub time_threshold_s: f64,
    pub overlap: OverlapMode,
}

impl TemporalAnalyzer {
    pub fn new(time_threshold_s: f64) -> Self {
        Self {
            time_threshold_s,
            overlap: OverlapMode::Window,
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapMode) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn find_overlap(&self, a: &Mission, b: &Mission) -> Option<TemporalOverlap> {
        let window_a = mission_window(a, self.overlap);
        let window_b = mission_window(b, self.overlap);

        if let Some(window) = window_a.intersection(&window_b) {
            return Some(TemporalOverlap {
                kind: OverlapKind::Direct,
                window,
                gap_s: 0.0,
            });
        }

        let gap = window_a.gap_to(&window_b)?;
        let gap_s = gap.duration_s();
        (gap_s <= self.time_threshold_s).then_some(TemporalOverlap {
            kind: OverlapKind::NearMiss,
            window: gap,
            gap_s,
        })
    }
}

/// The part of a mission's time axis that takes part in overlap checks.
pub fn mission_window(mission: &Mission, overlap: OverlapMode) -> TimeWindow {
    match overlap {
        OverlapMode::Window => mission.window(),
        OverlapMode::Coverage => mission.covered_window(),
    }
}

/// Two linear legs flown at the same time, restricted to their shared interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentOverlap {
    pub primary: Segment,
    pub other: Segment,
    pub start_s: f64,
    pub end_s: f64,
}

/// Every pair of segments that are airborne simultaneously within `range`.
///
/// Both trajectories must share a time reference. Pairs are produced in
/// non-decreasing order of `start_s`; legs that merely touch at a boundary
/// yield a zero-length overlap.
pub fn segment_overlaps(
    primary: &Trajectory,
    other: &Trajectory,
    range: (f64, f64),
) -> Vec<SegmentOverlap> {
    let segments_a: Vec<Segment> = primary.segments().collect();
    let segments_b: Vec<Segment> = other.segments().collect();
    let mut overlaps = Vec::new();

    let (mut i, mut j) = (0usize, 0usize);
    while i < segments_a.len() && j < segments_b.len() {
        let sa = segments_a[i];
        let sb = segments_b[j];

        let start_s = sa.start_s.max(sb.start_s).max(range.0);
        let end_s = sa.end_s.min(sb.end_s).min(range.1);
        if start_s <= end_s {
            overlaps.push(SegmentOverlap {
                primary: sa,
                other: sb,
                start_s,
                end_s,
            });
        }

        if sa.end_s < sb.end_s {
            i += 1;
        } else if sb.end_s < sa.end_s {
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }

    overlaps
}
