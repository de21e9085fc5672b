use serde::{Deserialize, Serialize};

use crate::error::{AcademicError, Result};
use crate::grading::{round_half_up, GradeBand, GradeTable};

pub const CA1_WEIGHT: f64 = 0.15;
pub const CA2_WEIGHT: f64 = 0.15;
pub const EXAM_WEIGHT: f64 = 0.70;

const COMPONENT_MAX: f64 = 100.0;

/// Relative weight of each assessment component in the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentWeights {
    pub ca1: f64,
    pub ca2: f64,
    pub exam: f64,
}

impl Default for AssessmentWeights {
    fn default() -> Self {
        Self {
            ca1: CA1_WEIGHT,
            ca2: CA2_WEIGHT,
            exam: EXAM_WEIGHT,
        }
    }
}

impl AssessmentWeights {
    pub fn new(ca1: f64, ca2: f64, exam: f64) -> Result<Self> {
        let weights = Self { ca1, ca2, exam };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        let parts = [self.ca1, self.ca2, self.exam];
        let sum: f64 = parts.iter().sum();
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) || (sum - 1.0).abs() > 1e-9 {
            return Err(AcademicError::InvalidWeights(sum));
        }
        Ok(())
    }
}

/// Component marks, each already normalized to 0..=100. Deserializing
/// goes through the same range checks as `ScoreComponents::new`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedComponents")]
pub struct ScoreComponents {
    pub ca1: f64,
    pub ca2: f64,
    pub exam: f64,
}

#[derive(Deserialize)]
struct UncheckedComponents {
    ca1: f64,
    ca2: f64,
    exam: f64,
}

impl TryFrom<UncheckedComponents> for ScoreComponents {
    type Error = AcademicError;

    fn try_from(raw: UncheckedComponents) -> Result<Self> {
        Self::new(raw.ca1, raw.ca2, raw.exam)
    }
}

impl ScoreComponents {
    pub fn new(ca1: f64, ca2: f64, exam: f64) -> Result<Self> {
        check_component("ca1", ca1)?;
        check_component("ca2", ca2)?;
        check_component("exam", exam)?;
        Ok(Self { ca1, ca2, exam })
    }

    /// Builds components from raw marks and the maximum each was marked out of.
    pub fn from_raw_marks(
        ca1: (f64, f64),
        ca2: (f64, f64),
        exam: (f64, f64),
    ) -> Result<Self> {
        Self::new(
            normalize_component("ca1", ca1.0, ca1.1)?,
            normalize_component("ca2", ca2.0, ca2.1)?,
            normalize_component("exam", exam.0, exam.1)?,
        )
    }

    pub fn weighted_total(&self, weights: &AssessmentWeights) -> u8 {
        let sum = self.ca1 * weights.ca1 + self.ca2 * weights.ca2 + self.exam * weights.exam;
        // Snap to micro-units so 0.15 * 50 style products hit their exact half.
        let snapped = (sum * 1e6).round() / 1e6;
        round_half_up(snapped).clamp(0.0, 100.0) as u8
    }
}

fn check_component(component: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=COMPONENT_MAX).contains(&value) {
        return Err(AcademicError::InvalidComponent {
            component,
            value,
            max: COMPONENT_MAX,
        });
    }
    Ok(())
}

/// Converts a raw mark out of `max` to a 0..=100 percentage.
pub fn normalize_component(component: &'static str, raw: f64, max: f64) -> Result<f64> {
    if !max.is_finite() || max <= 0.0 || !raw.is_finite() || raw < 0.0 || raw > max {
        return Err(AcademicError::InvalidComponent {
            component,
            value: raw,
            max,
        });
    }
    Ok(100.0 * raw / max)
}

pub fn compute_final_score(ca1: f64, ca2: f64, exam: f64) -> Result<u8> {
    compute_final_score_with(ca1, ca2, exam, &AssessmentWeights::default())
}

pub fn compute_final_score_with(
    ca1: f64,
    ca2: f64,
    exam: f64,
    weights: &AssessmentWeights,
) -> Result<u8> {
    weights.validate()?;
    Ok(ScoreComponents::new(ca1, ca2, exam)?.weighted_total(weights))
}

/// A final score for one student in one subject and term.
///
/// When components are present the raw score is always derived from them;
/// there is no way to set both independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRecord {
    raw_score: u8,
    components: Option<ScoreComponents>,
}

impl ScoreRecord {
    pub fn from_components(components: ScoreComponents, weights: &AssessmentWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            raw_score: components.weighted_total(weights),
            components: Some(components),
        })
    }

    /// A record with no component breakdown, e.g. a transferred final mark.
    pub fn from_raw(score: f64) -> Result<Self> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(AcademicError::InvalidScore(score));
        }
        Ok(Self {
            raw_score: round_half_up(score) as u8,
            components: None,
        })
    }

    pub fn raw_score(&self) -> u8 {
        self.raw_score
    }

    pub fn components(&self) -> Option<&ScoreComponents> {
        self.components.as_ref()
    }

    pub fn grade<'a>(&self, table: &'a GradeTable) -> &'a GradeBand {
        // raw_score is bounded at construction, so resolution cannot fail.
        table
            .resolve_strict(f64::from(self.raw_score))
            .unwrap_or(&table.bands()[table.bands().len() - 1])
    }
}
