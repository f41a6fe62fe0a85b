//! Conflict detection coordinator.
//!
//! Checks a primary mission against every other mission, merging the
//! temporal, spatial and (optionally) path analyses into one ordered
//! [`ConflictReport`].

use crate::error::{ConfigError, DetectionError, MissionError};
use crate::models::{ConflictKind, ConflictRecord, ConflictReport, Mission, Position};
use crate::path::{PathAnalyzer, PathProximity};
use crate::rules::{DetectionConfig, TemporalStrategy};
use crate::spatial::{SpatialAnalyzer, SpatialEvent};
use crate::temporal::{OverlapKind, TemporalAnalyzer, TemporalOverlap};
use std::collections::HashSet;

/// One-shot detection with an explicit configuration.
pub fn detect(
    primary: &Mission,
    others: &[Mission],
    config: &DetectionConfig,
) -> Result<ConflictReport, DetectionError> {
    ConflictDetector::new(config.clone())?.detect(primary, others)
}

/// Strategic deconfliction engine for planned missions.
///
/// Holds no per-run state: the same detector can be reused and produces an
/// identical report for identical inputs.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    config: DetectionConfig,
    spatial: SpatialAnalyzer,
    /// Always compares declared windows; `overlap` only narrows the spatial pass
    temporal: TemporalAnalyzer,
    path: Option<PathAnalyzer>,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        let config = DetectionConfig::default();
        Self {
            spatial: SpatialAnalyzer {
                radius_m: config.safety_radius_m,
                sample_step_s: config.sample_step_s,
                method: config.method,
                overlap: config.overlap,
            },
            temporal: TemporalAnalyzer::new(config.time_threshold_s),
            path: None,
            config,
        }
    }
}

impl ConflictDetector {
    /// Create a detector, rejecting configurations that cannot run.
    pub fn new(config: DetectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.strategy == TemporalStrategy::Folded && config.temporal_advisories {
            tracing::warn!("temporal advisories are ignored with the folded strategy");
        }
        Ok(Self {
            spatial: SpatialAnalyzer::from_config(&config)?,
            temporal: TemporalAnalyzer::new(config.time_threshold_s),
            path: config
                .path_proximity
                .then(|| PathAnalyzer::from_config(&config)),
            config,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Check `primary` against each of `others`.
    ///
    /// Every mission is validated before any analysis; the first invalid one
    /// aborts the run.
    pub fn detect(
        &self,
        primary: &Mission,
        others: &[Mission],
    ) -> Result<ConflictReport, DetectionError> {
        validate_missions(primary, others)?;

        let mut records = Vec::new();
        for other in others {
            records.extend(self.evaluate_pair(primary, other)?);
        }

        let report = ConflictReport::new(primary.id.clone(), records);
        tracing::info!(
            primary = %primary.id,
            others = others.len(),
            conflicts = report.len(),
            "conflict detection complete"
        );
        Ok(report)
    }

    /// Records for a single (primary, other) pair, unsorted.
    ///
    /// Assumes both missions are valid.
    pub fn evaluate_pair(
        &self,
        primary: &Mission,
        other: &Mission,
    ) -> Result<Vec<ConflictRecord>, ConfigError> {
        let mut records = self.separation_records(primary, other)?;
        if let Some(path) = &self.path {
            records.extend(
                path.analyze(primary, other)
                    .into_iter()
                    .map(|hit| self.path_record(other, hit)),
            );
        }
        Ok(records)
    }

    fn separation_records(
        &self,
        primary: &Mission,
        other: &Mission,
    ) -> Result<Vec<ConflictRecord>, ConfigError> {
        let gate = match self.config.strategy {
            TemporalStrategy::Split => match self.temporal.find_overlap(primary, other) {
                Some(overlap) => Some(overlap),
                None => {
                    tracing::debug!(other = %other.id, "windows disjoint beyond threshold");
                    return Ok(Vec::new());
                }
            },
            TemporalStrategy::Folded => None,
        };

        let kind = if gate.is_some() {
            ConflictKind::Both
        } else {
            ConflictKind::Spatial
        };

        let events = self.spatial.analyze(primary, other)?;
        tracing::debug!(
            other = %other.id,
            overlap = ?gate.map(|g| g.kind),
            events = events.len(),
            "pair evaluated"
        );

        if !events.is_empty() {
            return Ok(events
                .into_iter()
                .map(|event| self.spatial_record(other, kind, event))
                .collect());
        }

        Ok(match gate {
            Some(overlap) if self.config.temporal_advisories => self
                .temporal_record(primary, other, overlap)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        })
    }

    fn spatial_record(
        &self,
        other: &Mission,
        kind: ConflictKind,
        event: SpatialEvent,
    ) -> ConflictRecord {
        ConflictRecord {
            other_id: other.id.clone(),
            kind,
            time: event.time,
            other_time: None,
            window: Some(event.window),
            location: event.location,
            primary_location: Some(event.primary_position),
            other_location: Some(event.other_position),
            distance_m: event.distance_m,
            radius_m: self.config.safety_radius_m,
            time_gap_s: 0.0,
            primary_segment: None,
            other_segment: None,
        }
    }

    /// Advisory for overlapping windows that never breach the radius.
    ///
    /// `None` only when neither a shared airborne instant nor facing mission
    /// ends exist, which validation rules out.
    fn temporal_record(
        &self,
        primary: &Mission,
        other: &Mission,
        overlap: TemporalOverlap,
    ) -> Option<ConflictRecord> {
        let approach = match overlap.kind {
            OverlapKind::Direct => self
                .spatial
                .closest_approach(primary, other)
                .map(|a| (a.time, a.primary_position, a.other_position)),
            OverlapKind::NearMiss => None,
        };

        let (time, (p, o)) = match approach {
            Some((time, p, o)) => (time, (p, o)),
            None => match edge_positions(primary, other) {
                Some(positions) => (overlap.window.start, positions),
                None => {
                    tracing::warn!(other = %other.id, "no positions for temporal advisory");
                    return None;
                }
            },
        };

        Some(ConflictRecord {
            other_id: other.id.clone(),
            kind: ConflictKind::Temporal,
            time,
            other_time: None,
            window: Some(overlap.window),
            location: p.midpoint(&o),
            primary_location: Some(p),
            other_location: Some(o),
            distance_m: p.distance_to(&o),
            radius_m: self.config.safety_radius_m,
            time_gap_s: overlap.gap_s,
            primary_segment: None,
            other_segment: None,
        })
    }

    fn path_record(&self, other: &Mission, hit: PathProximity) -> ConflictRecord {
        ConflictRecord {
            other_id: other.id.clone(),
            kind: ConflictKind::Path,
            time: hit.primary_time,
            other_time: Some(hit.other_time),
            window: None,
            location: hit.primary_point.midpoint(&hit.other_point),
            primary_location: Some(hit.primary_point),
            other_location: Some(hit.other_point),
            distance_m: hit.distance_m,
            radius_m: self.config.safety_radius_m,
            time_gap_s: hit.time_gap_s,
            primary_segment: Some(hit.primary_segment),
            other_segment: Some(hit.other_segment),
        }
    }
}

/// Positions at the facing ends of two missions that are never airborne together.
fn edge_positions(primary: &Mission, other: &Mission) -> Option<(Position, Position)> {
    let (p_first, p_last) = (primary.waypoints.first()?, primary.waypoints.last()?);
    let (o_first, o_last) = (other.waypoints.first()?, other.waypoints.last()?);
    if p_last.timestamp <= o_first.timestamp {
        Some((p_last.position, o_first.position))
    } else if o_last.timestamp <= p_first.timestamp {
        Some((p_first.position, o_last.position))
    } else {
        None
    }
}

fn validate_missions(primary: &Mission, others: &[Mission]) -> Result<(), MissionError> {
    let mut seen = HashSet::with_capacity(others.len() + 1);
    for mission in std::iter::once(primary).chain(others) {
        mission.validate()?;
        if !seen.insert(mission.id.as_str()) {
            return Err(MissionError::DuplicateMissionId {
                mission_id: mission.id.clone(),
            });
        }
    }
    Ok(())
}
