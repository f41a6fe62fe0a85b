//! Human-readable conflict summary.

use deconflict_core::{ConflictKind, ConflictRecord, ConflictReport, DetectionConfig};
use std::fmt::Write;

pub fn render(report: &ConflictReport, config: &DetectionConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Primary mission {}: radius {} m, time threshold {} s",
        report.primary_id, config.safety_radius_m, config.time_threshold_s
    );

    if report.is_clear() {
        out.push_str("CLEAR: no conflicts detected\n");
        return out;
    }

    let counts = report.count_by_kind();
    let _ = writeln!(out, "CONFLICT: {} record(s)", report.len());
    for kind in [
        ConflictKind::Spatial,
        ConflictKind::Temporal,
        ConflictKind::Both,
        ConflictKind::Path,
    ] {
        let _ = writeln!(
            out,
            "  {:<8} {}",
            kind.as_str(),
            counts.get(&kind).copied().unwrap_or(0)
        );
    }
    if let Some(min) = report.min_distance_m() {
        let _ = writeln!(out, "  closest separation {min:.2} m");
    }

    out.push('\n');
    for record in report.iter() {
        let _ = writeln!(out, "{}", record_line(record));
    }
    out
}

fn record_line(record: &ConflictRecord) -> String {
    let mut line = format!(
        "{}  {:<12} {:<8} dist {:>7.2} m at ({:.1}, {:.1}, {:.1})",
        record.time.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        record.other_id,
        record.kind.as_str(),
        record.distance_m,
        record.location.x,
        record.location.y,
        record.location.z,
    );
    if record.time_gap_s > 0.0 {
        let _ = write!(line, " gap {:.1} s", record.time_gap_s);
    }
    if let (Some(primary), Some(other)) = (record.primary_segment, record.other_segment) {
        let _ = write!(line, " legs {primary}/{other}");
    }
    if let Some(other_time) = record.other_time {
        let _ = write!(line, " other passes {}", other_time.format("%H:%M:%S%.3f"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use deconflict_core::Position;

    fn record(id: &str, kind: ConflictKind, distance_m: f64) -> ConflictRecord {
        ConflictRecord {
            other_id: id.to_string(),
            kind,
            time: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 5).unwrap(),
            other_time: None,
            window: None,
            location: Position::new(5.0, 0.0, 10.0),
            primary_location: None,
            other_location: None,
            distance_m,
            radius_m: 10.0,
            time_gap_s: 0.0,
            primary_segment: None,
            other_segment: None,
        }
    }

    #[test]
    fn test_clear_summary() {
        let report = ConflictReport::new("P1", Vec::new());
        let text = render(&report, &DetectionConfig::default());
        assert!(text.contains("CLEAR"));
    }

    #[test]
    fn test_summary_counts_and_lines() {
        let report = ConflictReport::new(
            "P1",
            vec![
                record("D1", ConflictKind::Both, 1.5),
                record("D2", ConflictKind::Temporal, 42.0),
            ],
        );
        let text = render(&report, &DetectionConfig::default());
        assert!(text.contains("CONFLICT: 2 record(s)"));
        assert!(text.contains("both     1"));
        assert!(text.contains("temporal 1"));
        assert!(text.contains("closest separation 1.50 m"));
        assert!(text.contains("path     0"));
        assert!(text.contains("dist   42.00 m"));
    }

    #[test]
    fn test_path_line_names_legs_and_other_pass() {
        let mut path = record("D3", ConflictKind::Path, 0.5);
        path.time_gap_s = 3.0;
        path.other_time = Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 8).unwrap());
        path.primary_segment = Some(0);
        path.other_segment = Some(2);

        let text = render(&ConflictReport::new("P1", vec![path]), &DetectionConfig::default());
        assert!(text.contains("path     1"));
        assert!(!text.contains("closest separation"));
        assert!(text.contains("gap 3.0 s legs 0/2 other passes 12:00:08.000"));
    }
}
