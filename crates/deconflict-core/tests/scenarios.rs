//! End-to-end detection scenarios.
//!
//! Each scenario runs through the public `ConflictDetector` API with every
//! combination of temporal strategy and spatial method.

use chrono::{DateTime, Duration, TimeZone, Utc};
use deconflict_core::{
    find_spatial_conflicts, find_temporal_overlap, ConflictDetector, ConflictKind, ConflictReport,
    DetectionConfig, Mission, Position, SpatialMethod, TemporalStrategy, Waypoint,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
}

fn at(sec: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(sec)
}

fn mission(id: &str, points: &[(f64, f64, f64, i64)]) -> Mission {
    let waypoints = points
        .iter()
        .map(|&(x, y, z, sec)| Waypoint::new(x, y, z, at(sec)))
        .collect();
    Mission::from_waypoints(id, waypoints).unwrap()
}

fn all_configs(radius_m: f64, time_threshold_s: f64) -> Vec<DetectionConfig> {
    let mut configs = Vec::new();
    for strategy in [TemporalStrategy::Split, TemporalStrategy::Folded] {
        for method in [SpatialMethod::Analytic, SpatialMethod::Sampled] {
            configs.push(
                DetectionConfig::new(radius_m, time_threshold_s)
                    .with_strategy(strategy)
                    .with_method(method),
            );
        }
    }
    configs
}

fn run(config: &DetectionConfig, primary: &Mission, others: &[Mission]) -> ConflictReport {
    ConflictDetector::new(config.clone())
        .unwrap()
        .detect(primary, others)
        .unwrap()
}

#[test]
fn scenario_hovering_drone_on_primary_path() {
    let primary = mission("PRIMARY", &[(0.0, 0.0, 10.0, 0), (10.0, 0.0, 10.0, 10)]);
    let other = mission("HOVER", &[(5.0, 0.0, 10.0, 4), (5.0, 0.0, 10.0, 6)]);

    for config in all_configs(10.0, 2.0) {
        let report = run(&config, &primary, &[other.clone()]);
        assert_eq!(report.len(), 1, "{config:?}");

        let record = &report.records[0];
        assert_eq!(record.other_id, "HOVER");
        assert_eq!(record.time, at(5));
        assert!(record.distance_m < 1e-9);
        assert!(record.location.distance_to(&Position::new(5.0, 0.0, 10.0)) < 1e-9);
        assert!(record.is_separation_violation());
    }
}

#[test]
fn scenario_windows_far_apart_in_time() {
    let primary = mission("PRIMARY", &[(0.0, 0.0, 10.0, 0), (100.0, 0.0, 10.0, 50)]);
    let other = mission("LATER", &[(0.0, 0.0, 10.0, 150), (100.0, 0.0, 10.0, 200)]);

    assert!(find_temporal_overlap(&primary, &other, 2.0).is_none());
    assert!(find_spatial_conflicts(&primary, &other, 10.0, 1.0)
        .unwrap()
        .is_empty());

    for config in all_configs(10.0, 2.0) {
        let config = config.with_temporal_advisories(true);
        assert!(run(&config, &primary, &[other.clone()]).is_clear());
    }
}

#[test]
fn scenario_vertical_separation_exceeds_radius() {
    let primary = mission("LOW", &[(0.0, 0.0, 10.0, 0), (100.0, 100.0, 10.0, 60)]);
    let other = mission("HIGH", &[(0.0, 0.0, 15.0, 0), (100.0, 100.0, 15.0, 60)]);

    for config in all_configs(3.0, 2.0) {
        assert!(run(&config, &primary, &[other.clone()]).is_clear(), "{config:?}");
    }
}

#[test]
fn scenario_distance_exactly_equal_to_radius() {
    let primary = mission("PRIMARY", &[(0.0, 0.0, 10.0, 0), (10.0, 0.0, 10.0, 10)]);
    let other = mission("ABEAM", &[(5.0, 10.0, 10.0, 0), (5.0, 10.0, 10.0, 10)]);

    for config in all_configs(10.0, 2.0) {
        let report = run(&config, &primary, &[other.clone()]);
        assert_eq!(report.len(), 1, "{config:?}");
        assert_eq!(report.records[0].distance_m, 10.0);
        assert_eq!(report.records[0].time, at(5));
    }
}

#[test]
fn detection_is_idempotent() {
    let primary = mission(
        "PRIMARY",
        &[(0.0, 0.0, 10.0, 0), (50.0, 0.0, 10.0, 25), (50.0, 50.0, 20.0, 50)],
    );
    let others = vec![
        mission("CROSS", &[(25.0, -25.0, 10.0, 0), (25.0, 25.0, 10.0, 25)]),
        mission("CLIMB", &[(50.0, 0.0, 0.0, 20), (50.0, 60.0, 30.0, 60)]),
        mission("FAR", &[(500.0, 500.0, 10.0, 0), (600.0, 500.0, 10.0, 50)]),
    ];
    let detector = ConflictDetector::new(DetectionConfig::new(5.0, 2.0)).unwrap();

    let first = detector.detect(&primary, &others).unwrap();
    let second = detector.detect(&primary, &others).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_clear());
}

#[test]
fn report_is_sorted_by_time_then_id() {
    let primary = mission("PRIMARY", &[(0.0, 0.0, 10.0, 0), (100.0, 0.0, 10.0, 100)]);
    let others = vec![
        mission("ZULU", &[(20.0, 0.0, 10.0, 0), (20.0, 0.0, 10.0, 100)]),
        mission("BRAVO", &[(80.0, 0.0, 10.0, 0), (80.0, 0.0, 10.0, 100)]),
        mission("ALPHA", &[(20.0, 1.0, 10.0, 0), (20.0, 1.0, 10.0, 100)]),
    ];

    for config in all_configs(3.0, 2.0) {
        let report = run(&config, &primary, &others);
        let order: Vec<_> = report
            .iter()
            .map(|r| (r.time, r.other_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(at(20), "ALPHA"), (at(20), "ZULU"), (at(80), "BRAVO")],
            "{config:?}"
        );
    }
}

#[test]
fn strategies_agree_on_violations() {
    let primary = mission(
        "PRIMARY",
        &[(0.0, 0.0, 30.0, 0), (60.0, 0.0, 30.0, 30), (60.0, 60.0, 30.0, 60)],
    );
    let others = vec![
        mission("HEAD-ON", &[(60.0, 0.5, 30.0, 0), (0.0, 0.5, 30.0, 30)]),
        mission("CROSSING", &[(30.0, 30.0, 30.0, 15), (90.0, 30.0, 30.0, 75)]),
        mission("PARALLEL", &[(0.0, 40.0, 30.0, 0), (60.0, 40.0, 30.0, 30)]),
    ];

    for method in [SpatialMethod::Analytic, SpatialMethod::Sampled] {
        let split = run(
            &DetectionConfig::new(4.0, 2.0).with_method(method),
            &primary,
            &others,
        );
        let folded = run(
            &DetectionConfig::new(4.0, 2.0)
                .with_method(method)
                .with_strategy(TemporalStrategy::Folded),
            &primary,
            &others,
        );

        assert_eq!(split.len(), folded.len());
        assert!(!split.is_clear());
        for (s, f) in split.iter().zip(folded.iter()) {
            assert_eq!(s.other_id, f.other_id);
            assert_eq!(s.time, f.time);
            assert_eq!(s.distance_m, f.distance_m);
            assert_eq!(s.location, f.location);
            assert_eq!(s.kind, ConflictKind::Both);
            assert_eq!(f.kind, ConflictKind::Spatial);
        }
    }
}

#[test]
fn analytic_and_sampled_find_the_same_encounters() {
    let primary = mission(
        "PRIMARY",
        &[(0.0, 0.0, 30.0, 0), (60.0, 0.0, 30.0, 30), (60.0, 60.0, 30.0, 60)],
    );
    let others = vec![
        mission("HEAD-ON", &[(60.0, 0.0, 30.0, 0), (0.0, 0.0, 30.0, 30)]),
        mission("CROSSING", &[(30.0, 30.0, 30.0, 15), (90.0, 30.0, 30.0, 75)]),
    ];

    let analytic = run(&DetectionConfig::new(4.0, 2.0), &primary, &others);
    let sampled = run(
        &DetectionConfig::new(4.0, 2.0).with_method(SpatialMethod::Sampled),
        &primary,
        &others,
    );

    let summary = |report: &ConflictReport| -> Vec<(String, DateTime<Utc>)> {
        report
            .iter()
            .map(|r| (r.other_id.clone(), r.time))
            .collect()
    };
    assert_eq!(summary(&analytic), summary(&sampled));
    assert_eq!(
        summary(&analytic),
        vec![
            ("HEAD-ON".to_string(), at(15)),
            ("CROSSING".to_string(), at(45)),
        ]
    );
}

#[test]
fn temporal_advisory_resolves_overlap_without_violation() {
    let primary = mission("PRIMARY", &[(0.0, 0.0, 10.0, 0), (100.0, 0.0, 10.0, 100)]);
    let distant = mission("DISTANT", &[(0.0, 300.0, 10.0, 50), (100.0, 300.0, 10.0, 150)]);

    let silent = run(&DetectionConfig::new(10.0, 2.0), &primary, &[distant.clone()]);
    assert!(silent.is_clear());

    let advised = run(
        &DetectionConfig::new(10.0, 2.0).with_temporal_advisories(true),
        &primary,
        &[distant],
    );
    assert_eq!(advised.len(), 1);
    let record = &advised.records[0];
    assert_eq!(record.kind, ConflictKind::Temporal);
    assert!(record.distance_m > record.radius_m);
    assert_eq!(advised.count_by_kind().get(&ConflictKind::Temporal), Some(&1));
}

#[test]
fn path_pass_flags_trailing_crossing_under_every_config() {
    let primary = mission("PRIMARY", &[(0.0, 0.0, 10.0, 0), (100.0, 0.0, 10.0, 50)]);
    let hover = mission("HOVER", &[(80.0, 0.0, 10.0, 38), (80.0, 0.0, 10.0, 42)]);
    let trailer = mission("TRAILER", &[(50.0, -50.0, 10.0, 40), (50.0, 50.0, 10.0, 60)]);
    let others = [hover, trailer];

    for config in all_configs(5.0, 2.0) {
        assert_eq!(run(&config, &primary, &others).len(), 1, "{config:?}");

        let report = run(&config.clone().with_path_proximity(None), &primary, &others);
        let kinds: Vec<_> = report.iter().map(|r| (r.other_id.as_str(), r.kind)).collect();
        assert_eq!(kinds.len(), 2, "{config:?}");
        assert_eq!(kinds[0], ("TRAILER", ConflictKind::Path));
        assert!(report.records[1].is_separation_violation());

        let path = &report.records[0];
        assert_eq!(path.time, at(25));
        assert_eq!(path.other_time, Some(at(50)));
        assert!((path.time_gap_s - 25.0).abs() < 1e-9);
        assert!(path.distance_m < 1e-9);

        let narrow = run(&config.with_path_proximity(Some(10.0)), &primary, &others);
        assert!(narrow.iter().all(|r| r.kind != ConflictKind::Path));
    }
}
