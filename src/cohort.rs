use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AcademicError, Result};
use crate::grading::{GradeTable, DEFAULT_GRADE_TABLE};
use crate::models::{StudentRef, StudentScore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub letter: String,
    pub count: usize,
}

/// Summary of one cohort's scores, typically one class in one subject and term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub count: usize,
    pub average: f64,
    pub standard_deviation: f64,
    pub median: f64,
    pub highest: f64,
    pub lowest: f64,
    pub pass_rate: f64,
    /// One entry per band, in table order (highest grade first).
    pub distribution: Vec<GradeCount>,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl ClassStatistics {
    /// Percentage of the cohort scoring strictly below `score`.
    pub fn percentile_of(&self, score: f64) -> f64 {
        let below = self.sorted.partition_point(|s| *s < score);
        100.0 * below as f64 / self.sorted.len() as f64
    }

    pub fn count_for(&self, letter: &str) -> usize {
        self.distribution
            .iter()
            .find(|g| g.letter.eq_ignore_ascii_case(letter))
            .map(|g| g.count)
            .unwrap_or(0)
    }
}

fn check_scores(scores: &[f64]) -> Result<()> {
    if scores.is_empty() {
        return Err(AcademicError::EmptyCohort);
    }
    if let Some(bad) = scores
        .iter()
        .find(|s| !s.is_finite() || !(0.0..=100.0).contains(*s))
    {
        return Err(AcademicError::InvalidScore(*bad));
    }
    Ok(())
}

fn sorted_copy(scores: &[f64]) -> Vec<f64> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0
    }
}

pub fn compute_class_statistics(scores: &[f64]) -> Result<ClassStatistics> {
    compute_class_statistics_with(scores, &DEFAULT_GRADE_TABLE)
}

pub fn compute_class_statistics_with(scores: &[f64], table: &GradeTable) -> Result<ClassStatistics> {
    check_scores(scores)?;

    let sorted = sorted_copy(scores);
    let n = sorted.len() as f64;
    let average = sorted.iter().sum::<f64>() / n;
    // Population deviation: the class is the whole population of interest.
    let variance = sorted.iter().map(|s| (s - average).powi(2)).sum::<f64>() / n;

    let mut distribution: Vec<GradeCount> = table
        .bands()
        .iter()
        .map(|b| GradeCount {
            letter: b.letter.clone(),
            count: 0,
        })
        .collect();
    let mut passes = 0usize;
    for score in &sorted {
        let band = table.resolve_strict(*score)?;
        if band.is_pass() {
            passes += 1;
        }
        if let Some(entry) = distribution.iter_mut().find(|g| g.letter == band.letter) {
            entry.count += 1;
        }
    }

    Ok(ClassStatistics {
        count: sorted.len(),
        average,
        standard_deviation: variance.sqrt(),
        median: median_of_sorted(&sorted),
        highest: sorted[sorted.len() - 1],
        lowest: sorted[0],
        pass_rate: 100.0 * passes as f64 / n,
        distribution,
        sorted,
    })
}

/// Mean grade points across a student's subject scores.
pub fn compute_gpa(scores: &[f64]) -> Result<f64> {
    compute_gpa_with(scores, &DEFAULT_GRADE_TABLE)
}

pub fn compute_gpa_with(scores: &[f64], table: &GradeTable) -> Result<f64> {
    check_scores(scores)?;
    let mut total = 0.0;
    for score in scores {
        total += table.resolve_strict(*score)?.points;
    }
    Ok(total / scores.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentGpa {
    pub student: StudentRef,
    pub subjects: Vec<String>,
    pub gpa: f64,
}

/// One GPA per student across every subject in `scores`. Students are
/// told apart by id, so namesakes in a class stay separate rows.
pub fn gpa_by_student(scores: &[StudentScore], table: &GradeTable) -> Result<Vec<StudentGpa>> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, (&StudentRef, Vec<String>, Vec<f64>)> = HashMap::new();
    for score in scores {
        let entry = grouped.entry(score.student.student_id).or_insert_with(|| {
            order.push(score.student.student_id);
            (&score.student, Vec::new(), Vec::new())
        });
        entry.1.push(score.subject.clone());
        entry.2.push(f64::from(score.record.raw_score()));
    }

    let mut rows = Vec::with_capacity(order.len());
    for id in order {
        if let Some((student, subjects, values)) = grouped.remove(&id) {
            rows.push(StudentGpa {
                student: student.clone(),
                gpa: compute_gpa_with(&values, table)?,
                subjects,
            });
        }
    }
    rows.sort_by(|a, b| {
        a.student
            .full_name
            .cmp(&b.student.full_name)
            .then_with(|| a.student.admission_number.cmp(&b.student.admission_number))
    });
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPosition<K> {
    pub key: K,
    pub score: f64,
    pub position: usize,
}

/// Ranks entries by descending score. Tied scores share a position and the
/// next distinct score skips ahead (1st, 2nd, 2nd, 4th).
pub fn class_positions<K: Clone>(entries: &[(K, f64)]) -> Vec<ClassPosition<K>> {
    let mut ordered: Vec<&(K, f64)> = entries.iter().collect();
    ordered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut positions = Vec::with_capacity(ordered.len());
    let mut previous: Option<(f64, usize)> = None;
    for (i, (key, score)) in ordered.into_iter().enumerate() {
        let position = match previous {
            Some((prev_score, prev_position)) if prev_score == *score => prev_position,
            _ => i + 1,
        };
        previous = Some((*score, position));
        positions.push(ClassPosition {
            key: key.clone(),
            score: *score,
            position,
        });
    }
    positions
}

pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
