use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AcademicError, Result};

pub const EXCELLENT_THRESHOLD: f64 = 90.0;
pub const GOOD_THRESHOLD: f64 = 75.0;

/// Day counts for one student (or class) over a period. Days with no
/// record at all, such as holidays, count toward none of the buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceTally {
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    pub total_days: u32,
}

impl AttendanceTally {
    pub fn new(present_days: u32, late_days: u32, absent_days: u32, total_days: u32) -> Result<Self> {
        let tally = Self {
            present_days,
            late_days,
            absent_days,
            total_days,
        };
        tally.validate()?;
        Ok(tally)
    }

    pub fn validate(&self) -> Result<()> {
        let recorded = self.recorded_days();
        if recorded > u64::from(self.total_days) {
            return Err(AcademicError::InvalidTally {
                recorded,
                total_days: u64::from(self.total_days),
            });
        }
        Ok(())
    }

    /// Summed in `u64` so imported counts near `u32::MAX` cannot wrap.
    pub fn recorded_days(&self) -> u64 {
        u64::from(self.present_days) + u64::from(self.late_days) + u64::from(self.absent_days)
    }

    pub fn attended_days(&self) -> u64 {
        u64::from(self.present_days) + u64::from(self.late_days)
    }

    /// `(present + late) / total * 100`. Late arrivals count as attended.
    pub fn attendance_rate(&self) -> Result<f64> {
        self.validate()?;
        if self.total_days == 0 {
            return Err(AcademicError::NoAttendanceData);
        }
        Ok(100.0 * self.attended_days() as f64 / f64::from(self.total_days))
    }

    /// Adds two tallies. Fails with `InvalidTally` if any combined count
    /// no longer fits in a `u32`.
    pub fn merge(&self, other: &AttendanceTally) -> Result<AttendanceTally> {
        let overflow = || AcademicError::InvalidTally {
            recorded: self.recorded_days() + other.recorded_days(),
            total_days: u64::from(self.total_days) + u64::from(other.total_days),
        };
        let merged = AttendanceTally {
            present_days: self
                .present_days
                .checked_add(other.present_days)
                .ok_or_else(overflow)?,
            late_days: self.late_days.checked_add(other.late_days).ok_or_else(overflow)?,
            absent_days: self
                .absent_days
                .checked_add(other.absent_days)
                .ok_or_else(overflow)?,
            total_days: self.total_days.checked_add(other.total_days).ok_or_else(overflow)?,
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Excellent,
    Good,
    NeedsImprovement,
}

impl AttendanceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceThresholds {
    pub excellent: f64,
    pub good: f64,
}

impl Default for AttendanceThresholds {
    fn default() -> Self {
        Self {
            excellent: EXCELLENT_THRESHOLD,
            good: GOOD_THRESHOLD,
        }
    }
}

impl AttendanceThresholds {
    pub fn classify_rate(&self, rate: f64) -> AttendanceStatus {
        if rate >= self.excellent {
            AttendanceStatus::Excellent
        } else if rate >= self.good {
            AttendanceStatus::Good
        } else {
            AttendanceStatus::NeedsImprovement
        }
    }

    pub fn is_valid(&self) -> bool {
        self.good.is_finite()
            && self.excellent.is_finite()
            && 0.0 <= self.good
            && self.good <= self.excellent
            && self.excellent <= 100.0
    }
}

pub fn classify_attendance(tally: &AttendanceTally) -> Result<AttendanceStatus> {
    classify_attendance_with(tally, &AttendanceThresholds::default())
}

pub fn classify_attendance_with(
    tally: &AttendanceTally,
    thresholds: &AttendanceThresholds,
) -> Result<AttendanceStatus> {
    Ok(thresholds.classify_rate(tally.attendance_rate()?))
}

/// A single day's register entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceMark {
    Present,
    Late,
    Absent,
    /// Recorded but not counted against the student, e.g. sick leave.
    Excused,
}

/// Builds a tally from daily marks. `total_days` is the number of school
/// days in the period; unmarked and excused days fall into no bucket.
pub fn tally_marks<I>(marks: I, total_days: u32) -> Result<AttendanceTally>
where
    I: IntoIterator<Item = AttendanceMark>,
{
    let mut tally = AttendanceTally {
        total_days,
        ..AttendanceTally::default()
    };
    for mark in marks {
        match mark {
            AttendanceMark::Present => tally.present_days += 1,
            AttendanceMark::Late => tally.late_days += 1,
            AttendanceMark::Absent => tally.absent_days += 1,
            AttendanceMark::Excused => {}
        }
    }
    tally.validate()?;
    Ok(tally)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub students: usize,
    pub combined: AttendanceTally,
    pub overall_rate: f64,
    pub excellent: usize,
    pub good: usize,
    pub needs_improvement: usize,
    /// Students whose tally covers zero school days. They are left out of
    /// the bands and the overall rate.
    pub no_data: usize,
}

impl AttendanceSummary {
    pub fn count_for(&self, status: AttendanceStatus) -> usize {
        match status {
            AttendanceStatus::Excellent => self.excellent,
            AttendanceStatus::Good => self.good,
            AttendanceStatus::NeedsImprovement => self.needs_improvement,
        }
    }
}

/// Rolls up per-student tallies into class-level counts. Fails with
/// `NoAttendanceData` only when no student has any school days recorded.
pub fn summarize_attendance(
    tallies: &[AttendanceTally],
    thresholds: &AttendanceThresholds,
) -> Result<AttendanceSummary> {
    if tallies.is_empty() {
        return Err(AcademicError::EmptyCohort);
    }

    let mut combined = AttendanceTally::default();
    let (mut excellent, mut good, mut needs_improvement, mut no_data) = (0, 0, 0, 0);
    for tally in tallies {
        tally.validate()?;
        if tally.total_days == 0 {
            no_data += 1;
            continue;
        }
        match classify_attendance_with(tally, thresholds)? {
            AttendanceStatus::Excellent => excellent += 1,
            AttendanceStatus::Good => good += 1,
            AttendanceStatus::NeedsImprovement => needs_improvement += 1,
        }
        combined = combined.merge(tally)?;
    }

    Ok(AttendanceSummary {
        students: tallies.len(),
        overall_rate: combined.attendance_rate()?,
        combined,
        excellent,
        good,
        needs_improvement,
        no_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(present: u32, late: u32, absent: u32, total: u32) -> AttendanceTally {
        AttendanceTally::new(present, late, absent, total).unwrap()
    }

    #[test]
    fn bands_follow_rate_thresholds() {
        assert_eq!(
            classify_attendance(&tally(90, 0, 10, 100)).unwrap(),
            AttendanceStatus::Excellent
        );
        assert_eq!(
            classify_attendance(&tally(70, 5, 25, 100)).unwrap(),
            AttendanceStatus::Good
        );
        assert_eq!(
            classify_attendance(&tally(50, 0, 50, 100)).unwrap(),
            AttendanceStatus::NeedsImprovement
        );
        assert_eq!(
            classify_attendance(&tally(89, 0, 11, 100)).unwrap(),
            AttendanceStatus::Good
        );
    }

    #[test]
    fn late_days_count_as_attended() {
        let t = tally(40, 20, 0, 60);
        assert_eq!(t.attendance_rate().unwrap(), 100.0);
    }

    #[test]
    fn unrecorded_days_reduce_the_rate() {
        // 5 of 60 days have no record at all.
        let t = tally(50, 0, 5, 60);
        let rate = t.attendance_rate().unwrap();
        assert!((rate - 83.333).abs() < 0.001);
    }

    #[test]
    fn zero_total_is_reported_not_nan() {
        assert_eq!(
            AttendanceTally::default().attendance_rate().unwrap_err(),
            AcademicError::NoAttendanceData
        );
        assert_eq!(
            classify_attendance(&AttendanceTally::default()).unwrap_err(),
            AcademicError::NoAttendanceData
        );
    }

    #[test]
    fn rejects_overfull_tally() {
        assert_eq!(
            AttendanceTally::new(50, 10, 50, 100).unwrap_err(),
            AcademicError::InvalidTally {
                recorded: 110,
                total_days: 100
            }
        );
    }

    #[test]
    fn huge_counts_are_rejected_not_wrapped() {
        assert_eq!(
            AttendanceTally::new(u32::MAX, 1, 0, 10).unwrap_err(),
            AcademicError::InvalidTally {
                recorded: u64::from(u32::MAX) + 1,
                total_days: 10
            }
        );
        let full = tally(u32::MAX, 0, 0, u32::MAX);
        assert!(matches!(
            full.merge(&tally(1, 0, 0, 1)),
            Err(AcademicError::InvalidTally { .. })
        ));
        assert_eq!(tally(2, 1, 0, 4).merge(&tally(1, 0, 1, 3)).unwrap(), tally(3, 1, 1, 7));
    }

    #[test]
    fn zero_day_students_do_not_hide_the_class() {
        let tallies = [tally(60, 0, 2, 62), tally(40, 2, 20, 62), AttendanceTally::default()];
        let summary = summarize_attendance(&tallies, &AttendanceThresholds::default()).unwrap();
        assert_eq!(summary.students, 3);
        assert_eq!(summary.no_data, 1);
        assert_eq!(summary.excellent, 1);
        assert_eq!(summary.needs_improvement, 1);
        assert_eq!(summary.combined, tally(100, 2, 22, 124));

        assert_eq!(
            summarize_attendance(&[AttendanceTally::default()], &AttendanceThresholds::default())
                .unwrap_err(),
            AcademicError::NoAttendanceData
        );
    }

    #[test]
    fn marks_build_a_tally() {
        use AttendanceMark::*;
        let t = tally_marks([Present, Present, Late, Absent, Excused], 6).unwrap();
        assert_eq!(t, tally(2, 1, 1, 6));
        assert!(tally_marks([Present, Present], 1).is_err());
    }

    #[test]
    fn summary_counts_each_band() {
        let tallies = [
            tally(95, 0, 5, 100),
            tally(80, 0, 20, 100),
            tally(60, 0, 40, 100),
            tally(45, 5, 0, 50),
        ];
        let summary = summarize_attendance(&tallies, &AttendanceThresholds::default()).unwrap();
        assert_eq!(summary.students, 4);
        assert_eq!(summary.count_for(AttendanceStatus::Excellent), 2);
        assert_eq!(summary.good, 1);
        assert_eq!(summary.needs_improvement, 1);
        assert_eq!(summary.no_data, 0);
        assert_eq!(summary.combined, tally(280, 5, 65, 350));
        assert!((summary.overall_rate - 285.0 / 350.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let strict = AttendanceThresholds {
            excellent: 95.0,
            good: 85.0,
        };
        assert!(strict.is_valid());
        assert_eq!(
            classify_attendance_with(&tally(90, 0, 10, 100), &strict).unwrap(),
            AttendanceStatus::Good
        );
        assert!(!AttendanceThresholds {
            excellent: 70.0,
            good: 80.0
        }
        .is_valid());
    }
}
