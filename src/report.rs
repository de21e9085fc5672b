use std::fmt::Write;

use school_rules::attendance::{summarize_attendance, AttendanceStatus};
use school_rules::cohort::{class_positions, compute_class_statistics_with, ordinal};
use school_rules::config::Rules;
use school_rules::error::AcademicError;
use school_rules::models::{CohortScope, StudentAttendance, StudentScore};

pub fn build_class_report(
    scope: &CohortScope,
    subject: &str,
    scores: &[StudentScore],
    attendance: &[StudentAttendance],
    rules: &Rules,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Performance Report");
    let _ = writeln!(
        output,
        "{} {} for {}, {} session",
        scope.class_level, subject, scope.term, scope.academic_year
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Summary");

    let values: Vec<f64> = scores
        .iter()
        .map(|s| f64::from(s.record.raw_score()))
        .collect();

    match compute_class_statistics_with(&values, &rules.grade_table) {
        Err(AcademicError::EmptyCohort) => {
            let _ = writeln!(output, "No scores recorded for this class.");
        }
        Err(err) => {
            let _ = writeln!(output, "Scores could not be summarized: {err}.");
        }
        Ok(stats) => {
            let _ = writeln!(output, "- Students scored: {}", stats.count);
            let _ = writeln!(output, "- Class average: {:.1}", stats.average);
            let _ = writeln!(output, "- Standard deviation: {:.2}", stats.standard_deviation);
            let _ = writeln!(output, "- Median: {:.1}", stats.median);
            let _ = writeln!(
                output,
                "- Highest / lowest: {:.0} / {:.0}",
                stats.highest, stats.lowest
            );
            let _ = writeln!(output, "- Pass rate: {:.1}%", stats.pass_rate);

            let _ = writeln!(output);
            let _ = writeln!(output, "## Grade Distribution");
            for (band, entry) in rules.grade_table.bands().iter().zip(&stats.distribution) {
                let _ = writeln!(
                    output,
                    "- {} ({}, {}-{}): {}",
                    entry.letter, band.label, band.min, band.max, entry.count
                );
            }

            let entries: Vec<(&StudentScore, f64)> = scores
                .iter()
                .map(|s| (s, f64::from(s.record.raw_score())))
                .collect();
            let _ = writeln!(output);
            let _ = writeln!(output, "## Class Positions");
            for position in class_positions(&entries).iter().take(10) {
                let band = position.key.record.grade(&rules.grade_table);
                let _ = writeln!(
                    output,
                    "- {} {} ({}) score {:.0} {} (top {:.0}%)",
                    ordinal(position.position),
                    position.key.student.full_name,
                    position.key.student.admission_number,
                    position.score,
                    band.letter,
                    100.0 - stats.percentile_of(position.score)
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");

    let tallies: Vec<_> = attendance.iter().map(|a| a.tally).collect();
    match summarize_attendance(&tallies, &rules.attendance) {
        Err(AcademicError::EmptyCohort) => {
            let _ = writeln!(output, "No attendance recorded for this class.");
        }
        Err(err) => {
            let _ = writeln!(output, "Attendance could not be summarized: {err}.");
        }
        Ok(summary) => {
            let _ = writeln!(
                output,
                "- Overall attendance: {:.1}% across {} students",
                summary.overall_rate, summary.students
            );
            for status in [
                AttendanceStatus::Excellent,
                AttendanceStatus::Good,
                AttendanceStatus::NeedsImprovement,
            ] {
                let _ = writeln!(output, "- {}: {}", status, summary.count_for(status));
            }
            if summary.no_data > 0 {
                let _ = writeln!(output, "- No school days recorded: {}", summary.no_data);
            }

            let flagged: Vec<&StudentAttendance> = attendance
                .iter()
                .filter(|a| {
                    a.tally
                        .attendance_rate()
                        .map(|rate| {
                            rules.attendance.classify_rate(rate)
                                == AttendanceStatus::NeedsImprovement
                        })
                        .unwrap_or(false)
                })
                .collect();
            if !flagged.is_empty() {
                let _ = writeln!(output);
                let _ = writeln!(output, "### Needs Follow-up");
                for entry in flagged {
                    let _ = writeln!(
                        output,
                        "- {} ({}): {} absent, {} late of {} days",
                        entry.student.full_name,
                        entry.student.admission_number,
                        entry.tally.absent_days,
                        entry.tally.late_days,
                        entry.tally.total_days
                    );
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use school_rules::attendance::AttendanceTally;
    use school_rules::calendar::AcademicTerm;
    use school_rules::models::StudentRef;
    use school_rules::scoring::{AssessmentWeights, ScoreComponents, ScoreRecord};
    use uuid::Uuid;

    fn student(name: &str, admission_number: &str) -> StudentRef {
        StudentRef {
            student_id: Uuid::new_v4(),
            admission_number: admission_number.to_string(),
            full_name: name.to_string(),
            class_level: "JSS2".to_string(),
        }
    }

    fn scope() -> CohortScope {
        CohortScope {
            class_level: "JSS2".to_string(),
            term: AcademicTerm::First,
            academic_year: "2024/2025".to_string(),
        }
    }

    fn score(name: &str, admission_number: &str, marks: (f64, f64, f64)) -> StudentScore {
        let components = ScoreComponents::new(marks.0, marks.1, marks.2).unwrap();
        StudentScore {
            student: student(name, admission_number),
            subject: "Mathematics".to_string(),
            term: AcademicTerm::First,
            academic_year: "2024/2025".to_string(),
            record: ScoreRecord::from_components(components, &AssessmentWeights::default())
                .unwrap(),
        }
    }

    fn attendance(name: &str, admission_number: &str, tally: AttendanceTally) -> StudentAttendance {
        StudentAttendance {
            student: student(name, admission_number),
            tally,
        }
    }

    #[test]
    fn report_lists_positions_and_attendance() {
        let scores = vec![
            score("Adaeze Okafor", "GSS/2023/001", (80.0, 80.0, 80.0)),
            score("Tunde Bakare", "GSS/2023/002", (60.0, 60.0, 60.0)),
        ];
        let attendance = vec![
            attendance(
                "Adaeze Okafor",
                "GSS/2023/001",
                AttendanceTally::new(58, 2, 2, 62).unwrap(),
            ),
            attendance(
                "Tunde Bakare",
                "GSS/2023/002",
                AttendanceTally::new(30, 4, 28, 62).unwrap(),
            ),
        ];

        let report = build_class_report(&scope(), "Mathematics", &scores, &attendance, &Rules::default());

        assert!(report.contains("# Class Performance Report"));
        assert!(report.contains("- Class average: 70.0"));
        assert!(report.contains("- 1st Adaeze Okafor (GSS/2023/001) score 80 A1"));
        assert!(report.contains("- 2nd Tunde Bakare (GSS/2023/002) score 60 C4"));
        assert!(report.contains("- Excellent: 1"));
        assert!(report.contains("- Needs Improvement: 1"));
        assert!(report.contains("### Needs Follow-up"));
        assert!(report.contains("Tunde Bakare (GSS/2023/002): 28 absent"));
    }

    #[test]
    fn zero_day_tally_is_listed_without_hiding_the_class() {
        let attendance = vec![
            attendance(
                "Adaeze Okafor",
                "GSS/2023/001",
                AttendanceTally::new(58, 2, 2, 62).unwrap(),
            ),
            attendance("Emeka Obi", "GSS/2023/003", AttendanceTally::default()),
        ];

        let report = build_class_report(&scope(), "Mathematics", &[], &attendance, &Rules::default());

        assert!(report.contains("- Overall attendance: 96.8% across 2 students"));
        assert!(report.contains("- Excellent: 1"));
        assert!(report.contains("- No school days recorded: 1"));
        assert!(!report.contains("No attendance recorded for this class."));
    }

    #[test]
    fn unusable_attendance_is_reported_as_an_error() {
        let attendance = vec![attendance("Emeka Obi", "GSS/2023/003", AttendanceTally::default())];
        let report = build_class_report(&scope(), "Mathematics", &[], &attendance, &Rules::default());
        assert!(report.contains("Attendance could not be summarized:"));
    }

    #[test]
    fn empty_class_reports_missing_data() {
        let report = build_class_report(&scope(), "Mathematics", &[], &[], &Rules::default());
        assert!(report.contains("No scores recorded for this class."));
        assert!(report.contains("No attendance recorded for this class."));
    }
}
