use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AcademicError, Result};

/// One row of the grading table. `min` and `max` are inclusive whole scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min: u8,
    pub max: u8,
    pub letter: String,
    pub label: String,
    pub points: f64,
    pub color_tag: String,
}

impl GradeBand {
    fn new(min: u8, max: u8, letter: &str, label: &str, points: f64, color_tag: &str) -> Self {
        Self {
            min,
            max,
            letter: letter.to_string(),
            label: label.to_string(),
            points,
            color_tag: color_tag.to_string(),
        }
    }

    pub fn contains(&self, score: u8) -> bool {
        self.min <= score && score <= self.max
    }

    pub fn is_pass(&self) -> bool {
        self.points > 0.0
    }
}

pub fn default_bands() -> Vec<GradeBand> {
    vec![
        GradeBand::new(80, 100, "A1", "Excellent", 5.0, "green"),
        GradeBand::new(75, 79, "A2", "Very Good", 4.5, "green"),
        GradeBand::new(70, 74, "B2", "Good", 4.0, "blue"),
        GradeBand::new(65, 69, "B3", "Good", 3.5, "blue"),
        GradeBand::new(60, 64, "C4", "Credit", 3.0, "yellow"),
        GradeBand::new(55, 59, "C5", "Credit", 2.5, "yellow"),
        GradeBand::new(50, 54, "D", "Pass", 2.0, "orange"),
        GradeBand::new(0, 49, "F", "Fail", 0.0, "red"),
    ]
}

pub static DEFAULT_GRADE_TABLE: Lazy<GradeTable> = Lazy::new(|| GradeTable {
    bands: default_bands(),
});

/// `Int(x + 0.5)`: halves always round up, matching how report cards round.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Ordered, validated grading table. Bands are kept sorted by descending `min`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeTable {
    bands: Vec<GradeBand>,
}

impl Default for GradeTable {
    fn default() -> Self {
        DEFAULT_GRADE_TABLE.clone()
    }
}

impl GradeTable {
    pub fn new(mut bands: Vec<GradeBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(AcademicError::InvalidBandTable(
                "at least one band is required".to_string(),
            ));
        }
        bands.sort_by(|a, b| b.min.cmp(&a.min));

        for band in &bands {
            if band.min > band.max {
                return Err(AcademicError::InvalidBandTable(format!(
                    "band {} has min {} above max {}",
                    band.letter, band.min, band.max
                )));
            }
            if band.letter.trim().is_empty() {
                return Err(AcademicError::InvalidBandTable(
                    "band letters must not be empty".to_string(),
                ));
            }
        }

        if bands[0].max != 100 {
            return Err(AcademicError::InvalidBandTable(format!(
                "top band {} must end at 100, not {}",
                bands[0].letter, bands[0].max
            )));
        }
        let last = &bands[bands.len() - 1];
        if last.min != 0 {
            return Err(AcademicError::InvalidBandTable(format!(
                "bottom band {} must start at 0, not {}",
                last.letter, last.min
            )));
        }

        for pair in bands.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if u16::from(lower.max) + 1 != u16::from(upper.min) {
                return Err(AcademicError::InvalidBandTable(format!(
                    "bands {} ({}..={}) and {} ({}..={}) leave a gap or overlap",
                    lower.letter, lower.min, lower.max, upper.letter, upper.min, upper.max
                )));
            }
        }

        for (i, band) in bands.iter().enumerate() {
            if bands[..i].iter().any(|b| b.letter == band.letter) {
                return Err(AcademicError::InvalidBandTable(format!(
                    "letter {} appears more than once",
                    band.letter
                )));
            }
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Resolves a score, clamping anything outside 0..=100 to the nearest bound.
    pub fn resolve(&self, score: f64) -> Result<&GradeBand> {
        if !score.is_finite() {
            return Err(AcademicError::InvalidScore(score));
        }
        let clamped = score.clamp(0.0, 100.0);
        if clamped != score {
            tracing::warn!(score, clamped, "score outside 0..=100 clamped before grading");
        }
        Ok(self.lookup(clamped))
    }

    /// Like [`GradeTable::resolve`] but rejects out-of-range scores instead of clamping.
    pub fn resolve_strict(&self, score: f64) -> Result<&GradeBand> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(AcademicError::InvalidScore(score));
        }
        Ok(self.lookup(score))
    }

    pub fn band_for_letter(&self, letter: &str) -> Option<&GradeBand> {
        self.bands
            .iter()
            .find(|b| b.letter.eq_ignore_ascii_case(letter))
    }

    /// Lowest score that lands in a band worth grade points.
    pub fn pass_mark(&self) -> u8 {
        self.bands
            .iter()
            .filter(|b| b.is_pass())
            .map(|b| b.min)
            .min()
            .unwrap_or(101)
    }

    fn lookup(&self, score: f64) -> &GradeBand {
        let whole = round_half_up(score).clamp(0.0, 100.0) as u8;
        // The table partitions 0..=100, so a match always exists; the last
        // band is only reached through the fallback for a malformed table.
        self.bands
            .iter()
            .find(|b| b.contains(whole))
            .unwrap_or(&self.bands[self.bands.len() - 1])
    }
}

pub fn resolve_grade(score: f64) -> Result<&'static GradeBand> {
    DEFAULT_GRADE_TABLE.resolve(score)
}

pub fn resolve_grade_strict(score: f64) -> Result<&'static GradeBand> {
    DEFAULT_GRADE_TABLE.resolve_strict(score)
}

pub fn grade_points(score: f64) -> Result<f64> {
    Ok(resolve_grade(score)?.points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_whole_score_maps_to_exactly_one_band() {
        for score in 0..=100u8 {
            let matching = DEFAULT_GRADE_TABLE
                .bands()
                .iter()
                .filter(|b| b.contains(score))
                .count();
            assert_eq!(matching, 1, "score {score}");

            let band = resolve_grade(f64::from(score)).unwrap();
            assert!(band.min <= score && score <= band.max);
        }
    }

    #[test]
    fn boundaries_land_in_expected_bands() {
        assert_eq!(resolve_grade(80.0).unwrap().letter, "A1");
        assert_eq!(resolve_grade(79.0).unwrap().letter, "A2");
        assert_eq!(resolve_grade(50.0).unwrap().letter, "D");
        assert_eq!(resolve_grade(49.0).unwrap().letter, "F");
        assert_eq!(resolve_grade(0.0).unwrap().letter, "F");
        assert_eq!(resolve_grade(100.0).unwrap().letter, "A1");
    }

    #[test]
    fn fractional_scores_round_half_up_before_lookup() {
        assert_eq!(resolve_grade(79.5).unwrap().letter, "A1");
        assert_eq!(resolve_grade(79.49).unwrap().letter, "A2");
        assert_eq!(resolve_grade(49.5).unwrap().letter, "D");
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(resolve_grade(130.0).unwrap().letter, "A1");
        assert_eq!(resolve_grade(-4.0).unwrap().letter, "F");
        assert!(matches!(
            resolve_grade(f64::NAN),
            Err(AcademicError::InvalidScore(_))
        ));
    }

    #[test]
    fn strict_resolution_rejects_out_of_range() {
        assert_eq!(
            resolve_grade_strict(101.0),
            Err(AcademicError::InvalidScore(101.0))
        );
        assert_eq!(resolve_grade_strict(64.0).unwrap().letter, "C4");
    }

    #[test]
    fn pass_mark_is_lowest_point_bearing_band() {
        assert_eq!(DEFAULT_GRADE_TABLE.pass_mark(), 50);
        assert_eq!(grade_points(72.0).unwrap(), 4.0);
    }

    #[test]
    fn table_rejects_gaps_and_overlaps() {
        let mut bands = default_bands();
        bands[1].min = 76;
        assert!(matches!(
            GradeTable::new(bands),
            Err(AcademicError::InvalidBandTable(_))
        ));

        let mut bands = default_bands();
        bands[7].max = 52;
        assert!(GradeTable::new(bands).is_err());

        let mut bands = default_bands();
        bands[0].max = 99;
        assert!(GradeTable::new(bands).is_err());
    }

    #[test]
    fn table_sorts_unordered_input() {
        let mut bands = default_bands();
        bands.reverse();
        let table = GradeTable::new(bands).unwrap();
        assert_eq!(table.bands()[0].letter, "A1");
        assert_eq!(table.resolve(55.0).unwrap().letter, "C5");
    }
}
