use thiserror::Error;

pub type Result<T> = std::result::Result<T, AcademicError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcademicError {
    #[error("score {0} is outside 0..=100")]
    InvalidScore(f64),

    #[error("{component} mark {value} is outside 0..={max}")]
    InvalidComponent {
        component: &'static str,
        value: f64,
        max: f64,
    },

    #[error("cannot aggregate an empty cohort")]
    EmptyCohort,

    #[error("attendance tally has no school days recorded")]
    NoAttendanceData,

    #[error(
        "attendance tally records {recorded} days but only {total_days} school days in the period"
    )]
    InvalidTally { recorded: u64, total_days: u64 },

    #[error("assessment weights must be non-negative and sum to 1.0 (got {0})")]
    InvalidWeights(f64),

    #[error("grade band table is invalid: {0}")]
    InvalidBandTable(String),

    #[error("attendance thresholds must satisfy 0 <= good ({good}) <= excellent ({excellent}) <= 100")]
    InvalidThresholds { excellent: f64, good: f64 },

    #[error("calendar configuration is invalid: {0}")]
    InvalidCalendar(String),
}
