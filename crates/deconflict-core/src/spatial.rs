//! Separation analysis between two interpolated trajectories.
//!
//! Two search methods share one overlap computation and one event shape:
//! fixed-step sampling, and a closed-form closest approach per pair of
//! simultaneously flown linear segments. Both trajectories are piecewise
//! linear, so within a segment pair the squared separation is a quadratic in
//! time and its minimum (and the sub-interval below the radius) can be solved
//! directly instead of hoping a sample lands near it.

use crate::error::ConfigError;
use crate::models::{Mission, Position, TimeWindow};
use crate::rules::{DetectionConfig, OverlapMode, SpatialMethod};
use crate::temporal::{mission_window, segment_overlaps, SegmentOverlap};
use crate::trajectory::Trajectory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relative speed below which two legs are treated as moving in parallel (m/s, squared).
const PARALLEL_EPS: f64 = 1e-12;
/// Violation intervals closer than this are one event (seconds).
const MERGE_EPS_S: f64 = 1e-9;
/// Upper bound on sampled instants for one mission pair.
pub const MAX_SAMPLES_PER_PAIR: u64 = 10_000_000;

/// One coalesced separation violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialEvent {
    /// Instant of minimum separation within the violation
    pub time: DateTime<Utc>,
    /// First to last instant below the radius
    pub window: TimeWindow,
    pub distance_m: f64,
    /// Midpoint between the two drones at `time`
    pub location: Position,
    pub primary_position: Position,
    pub other_position: Position,
}

/// Minimum separation over the whole overlap, regardless of any radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    pub time: DateTime<Utc>,
    pub distance_m: f64,
    pub primary_position: Position,
    pub other_position: Position,
}

/// Sampled search over the declared mission windows.
///
/// Returns every coalesced run of samples with separation `<= radius_m`.
/// A non-positive radius disables the check; a non-positive step is an error.
pub fn find_spatial_conflicts(
    a: &Mission,
    b: &Mission,
    radius_m: f64,
    sample_step_s: f64,
) -> Result<Vec<SpatialEvent>, ConfigError> {
    SpatialAnalyzer::new(radius_m, sample_step_s)?
        .with_method(SpatialMethod::Sampled)
        .with_overlap(OverlapMode::Window)
        .analyze(a, b)
}

#[derive(Debug, Clone, Copy)]
pub struct SpatialAnalyzer {
    pub radius_m: f64,
    pub sample_step_s: f64,
    pub method: SpatialMethod,
    pub overlap: OverlapMode,
}

#[derive(Debug, Clone, Copy)]
struct Approach {
    time_s: f64,
    distance_m: f64,
    primary: Position,
    other: Position,
}

impl Approach {
    fn closer_than(&self, other: &Approach) -> bool {
        self.distance_m < other.distance_m
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start_s: f64,
    end_s: f64,
    best: Approach,
}

impl Run {
    fn absorb(&mut self, next: Run) {
        self.end_s = self.end_s.max(next.end_s);
        if next.best.closer_than(&self.best) {
            self.best = next.best;
        }
    }
}

/// The two trajectories of a pair on a common time axis, plus their overlap.
struct PairContext {
    primary: Trajectory,
    other: Trajectory,
    lo: f64,
    hi: f64,
}

impl PairContext {
    fn new(a: &Mission, b: &Mission, overlap: OverlapMode) -> Option<Self> {
        let window = mission_window(a, overlap).intersection(&mission_window(b, overlap))?;
        let reference = a.start.min(b.start);
        let primary = Trajectory::new(a, reference);
        let other = Trajectory::new(b, reference);
        let (lo, hi) = primary.window_s(&window);
        Some(Self {
            primary,
            other,
            lo,
            hi,
        })
    }

    fn to_event(&self, run: Run) -> SpatialEvent {
        SpatialEvent {
            time: self.primary.to_timestamp(run.best.time_s),
            window: TimeWindow::new(
                self.primary.to_timestamp(run.start_s),
                self.primary.to_timestamp(run.end_s),
            ),
            distance_m: run.best.distance_m,
            location: run.best.primary.midpoint(&run.best.other),
            primary_position: run.best.primary,
            other_position: run.best.other,
        }
    }

    fn to_closest(&self, approach: Approach) -> ClosestApproach {
        ClosestApproach {
            time: self.primary.to_timestamp(approach.time_s),
            distance_m: approach.distance_m,
            primary_position: approach.primary,
            other_position: approach.other,
        }
    }

    /// Number of instants [`PairContext::sample_times`] would yield.
    fn sample_count(&self, step: f64) -> f64 {
        ((self.hi - self.lo) / step).ceil().max(0.0) + 1.0
    }

    /// Sample times `lo, lo + step, ...` plus `hi` itself.
    fn sample_times(&self, step: f64) -> impl Iterator<Item = f64> {
        let (lo, hi) = (self.lo, self.hi);
        let mut k: u64 = 0;
        let mut emitted_end = false;
        std::iter::from_fn(move || {
            if emitted_end {
                return None;
            }
            let t = lo + k as f64 * step;
            if t < hi {
                k += 1;
                return Some(t);
            }
            emitted_end = true;
            Some(hi)
        })
    }

    fn sample(&self, t: f64, hint_a: &mut usize, hint_b: &mut usize) -> Option<Approach> {
        let primary = self.primary.position_with_hint(t, hint_a)?;
        let other = self.other.position_with_hint(t, hint_b)?;
        Some(Approach {
            time_s: t,
            distance_m: primary.distance_to(&other),
            primary,
            other,
        })
    }
}

impl SpatialAnalyzer {
    pub fn new(radius_m: f64, sample_step_s: f64) -> Result<Self, ConfigError> {
        if sample_step_s.is_nan() || sample_step_s <= 0.0 {
            return Err(ConfigError::NonPositiveSampleStep(sample_step_s));
        }
        Ok(Self {
            radius_m,
            sample_step_s,
            method: SpatialMethod::default(),
            overlap: OverlapMode::default(),
        })
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.safety_radius_m, config.sample_step_s)?
            .with_method(config.method)
            .with_overlap(config.overlap))
    }

    pub fn with_method(mut self, method: SpatialMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapMode) -> Self {
        self.overlap = overlap;
        self
    }

    /// All separation violations between `a` and `b`, ordered by time.
    ///
    /// Fails only when the sampled method would need more than
    /// [`MAX_SAMPLES_PER_PAIR`] instants to cover the overlap.
    pub fn analyze(&self, a: &Mission, b: &Mission) -> Result<Vec<SpatialEvent>, ConfigError> {
        if self.radius_m.is_nan() || self.radius_m <= 0.0 {
            return Ok(Vec::new());
        }
        let Some(pair) = PairContext::new(a, b, self.overlap) else {
            return Ok(Vec::new());
        };

        let runs = match self.method {
            SpatialMethod::Sampled => {
                let samples = pair.sample_count(self.sample_step_s);
                if samples > MAX_SAMPLES_PER_PAIR as f64 {
                    return Err(ConfigError::SampleBudgetExceeded {
                        primary_id: a.id.clone(),
                        other_id: b.id.clone(),
                        step_s: self.sample_step_s,
                        samples,
                        limit: MAX_SAMPLES_PER_PAIR,
                    });
                }
                self.sampled_runs(&pair)
            }
            SpatialMethod::Analytic => self.analytic_runs(&pair),
        };

        tracing::trace!(
            primary = %a.id,
            other = %b.id,
            method = ?self.method,
            events = runs.len(),
            "spatial analysis complete"
        );

        Ok(runs.into_iter().map(|run| pair.to_event(run)).collect())
    }

    /// Minimum separation while both drones are airborne, `None` without simultaneous presence.
    ///
    /// Always solved in closed form: a shared airborne interval shorter than
    /// one sample step still has a minimum.
    pub fn closest_approach(&self, a: &Mission, b: &Mission) -> Option<ClosestApproach> {
        let pair = PairContext::new(a, b, self.overlap)?;
        let best = segment_overlaps(&pair.primary, &pair.other, (pair.lo, pair.hi))
            .iter()
            .map(minimize_segment_pair)
            .reduce(|best, next| if next.closer_than(&best) { next } else { best })?;
        Some(pair.to_closest(best))
    }

    fn sampled_runs(&self, pair: &PairContext) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut current: Option<Run> = None;
        let (mut hint_a, mut hint_b) = (0, 0);

        for t in pair.sample_times(self.sample_step_s) {
            let violation = pair
                .sample(t, &mut hint_a, &mut hint_b)
                .filter(|approach| approach.distance_m <= self.radius_m);

            let Some(best) = violation else {
                runs.extend(current.take());
                continue;
            };
            let sample = Run {
                start_s: t,
                end_s: t,
                best,
            };
            if let Some(run) = current.as_mut() {
                run.absorb(sample);
            } else {
                current = Some(sample);
            }
        }
        runs.extend(current);
        runs
    }

    fn analytic_runs(&self, pair: &PairContext) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();

        for overlap in segment_overlaps(&pair.primary, &pair.other, (pair.lo, pair.hi)) {
            let Some(run) = violation_interval(&overlap, self.radius_m) else {
                continue;
            };
            match runs.last_mut() {
                Some(last) if run.start_s <= last.end_s + MERGE_EPS_S => last.absorb(run),
                _ => runs.push(run),
            }
        }
        runs
    }
}

/// Relative motion `primary - other` over a segment pair, as `r0 + w * tau`.
struct RelativeMotion {
    r0: Position,
    w: Position,
}

impl RelativeMotion {
    fn new(overlap: &SegmentOverlap) -> Self {
        let pa = overlap.primary.position_at_s(overlap.start_s);
        let pb = overlap.other.position_at_s(overlap.start_s);
        let va = overlap.primary.velocity();
        let vb = overlap.other.velocity();
        Self {
            r0: Position::new(pa.x - pb.x, pa.y - pb.y, pa.z - pb.z),
            w: Position::new(va.x - vb.x, va.y - vb.y, va.z - vb.z),
        }
    }

    /// Coefficients of `|r(tau)|^2 = a tau^2 + b tau + c`.
    fn quadratic(&self) -> (f64, f64, f64) {
        let dot = |p: &Position, q: &Position| p.x * q.x + p.y * q.y + p.z * q.z;
        (
            dot(&self.w, &self.w),
            2.0 * dot(&self.r0, &self.w),
            dot(&self.r0, &self.r0),
        )
    }
}

fn approach_at(overlap: &SegmentOverlap, t: f64) -> Approach {
    let primary = overlap.primary.position_at_s(t);
    let other = overlap.other.position_at_s(t);
    Approach {
        time_s: t,
        distance_m: primary.distance_to(&other),
        primary,
        other,
    }
}

/// Closed-form closest approach of one segment pair, clamped to its shared interval.
fn minimize_segment_pair(overlap: &SegmentOverlap) -> Approach {
    let (a, b, _) = RelativeMotion::new(overlap).quadratic();
    let span = overlap.end_s - overlap.start_s;
    let tau = if a <= PARALLEL_EPS {
        0.0
    } else {
        (-b / (2.0 * a)).clamp(0.0, span)
    };
    approach_at(overlap, overlap.start_s + tau)
}

/// Sub-interval of a segment pair where separation is within `radius_m`.
fn violation_interval(overlap: &SegmentOverlap, radius_m: f64) -> Option<Run> {
    let best = minimize_segment_pair(overlap);
    if best.distance_m > radius_m {
        return None;
    }

    let (a, b, c) = RelativeMotion::new(overlap).quadratic();
    let span = overlap.end_s - overlap.start_s;
    let tau_best = best.time_s - overlap.start_s;

    let (tau_lo, tau_hi) = if a <= PARALLEL_EPS {
        (0.0, span)
    } else {
        let discriminant = b * b - 4.0 * a * (c - radius_m * radius_m);
        if discriminant <= 0.0 {
            (tau_best, tau_best)
        } else {
            let root = discriminant.sqrt();
            (
                ((-b - root) / (2.0 * a)).clamp(0.0, span).min(tau_best),
                ((-b + root) / (2.0 * a)).clamp(0.0, span).max(tau_best),
            )
        }
    };

    Some(Run {
        start_s: overlap.start_s + tau_lo,
        end_s: overlap.start_s + tau_hi,
        best,
    })
}
