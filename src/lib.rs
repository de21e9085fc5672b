//! Grading, attendance and calendar rules for a Nigerian secondary school.
//!
//! Everything here is a pure function over immutable tables. The default
//! tables are exposed as constants and statics; [`config::Rules`] carries a
//! validated override loaded from TOML.

pub mod attendance;
pub mod calendar;
pub mod cohort;
pub mod config;
pub mod error;
pub mod grading;
pub mod models;
pub mod scoring;
pub mod subjects;
pub mod validation;

pub use attendance::{classify_attendance, AttendanceStatus, AttendanceTally};
pub use calendar::{resolve_current_term, AcademicTerm, TermResolution};
pub use cohort::{compute_class_statistics, ClassStatistics};
pub use error::{AcademicError, Result};
pub use grading::{resolve_grade, GradeBand, GradeTable};
pub use scoring::{compute_final_score, ScoreComponents, ScoreRecord};
pub use subjects::{categorize_subject, SubjectCategory};
