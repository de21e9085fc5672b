use serde::Serialize;
use uuid::Uuid;

use crate::attendance::AttendanceTally;
use crate::calendar::AcademicTerm;
use crate::scoring::ScoreRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRef {
    pub student_id: Uuid,
    pub admission_number: String,
    pub full_name: String,
    pub class_level: String,
}

/// A student's final score in one subject for one term.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentScore {
    pub student: StudentRef,
    pub subject: String,
    pub term: AcademicTerm,
    pub academic_year: String,
    pub record: ScoreRecord,
}

/// A student's attendance tally within the `CohortScope` it was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAttendance {
    pub student: StudentRef,
    pub tally: AttendanceTally,
}

/// Identifies which cohort a command or report is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortScope {
    pub class_level: String,
    pub term: AcademicTerm,
    pub academic_year: String,
}
