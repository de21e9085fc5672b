use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceThresholds;
use crate::calendar::{default_terms, AcademicCalendar, TermDefinition};
use crate::error::AcademicError;
use crate::grading::{default_bands, GradeBand, GradeTable};
use crate::scoring::AssessmentWeights;

pub const CONFIG_FILE_NAME: &str = "school-rules.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub grading: GradingConfig,
    pub weights: AssessmentWeights,
    pub attendance: AttendanceThresholds,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub bands: Vec<GradeBand>,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub terms: Vec<TermDefinition>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            terms: default_terms(),
        }
    }
}

/// The validated rule set every report and command works from.
#[derive(Debug, Clone)]
pub struct Rules {
    pub grade_table: GradeTable,
    pub weights: AssessmentWeights,
    pub attendance: AttendanceThresholds,
    pub calendar: AcademicCalendar,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            grade_table: GradeTable::default(),
            weights: AssessmentWeights::default(),
            attendance: AttendanceThresholds::default(),
            calendar: AcademicCalendar::default(),
        }
    }
}

impl RulesConfig {
    pub fn into_rules(self) -> std::result::Result<Rules, AcademicError> {
        self.weights.validate()?;
        if !self.attendance.is_valid() {
            return Err(AcademicError::InvalidThresholds {
                excellent: self.attendance.excellent,
                good: self.attendance.good,
            });
        }
        Ok(Rules {
            grade_table: GradeTable::new(self.grading.bands)?,
            weights: self.weights,
            attendance: self.attendance,
            calendar: AcademicCalendar::new(self.calendar.terms)?,
        })
    }
}

/// Explicit `--config` path first, then `./school-rules.toml`, then built-in defaults.
pub fn load_rules(cli_config_path: Option<&Path>, cwd: &Path) -> Result<Rules> {
    let config = load_config(cli_config_path, cwd)?;
    config
        .into_rules()
        .context("configuration failed validation")
}

pub fn load_config(cli_config_path: Option<&Path>, cwd: &Path) -> Result<RulesConfig> {
    if let Some(path) = cli_config_path {
        if !path.exists() {
            bail!(
                "config file not found at {} (passed with --config)",
                path.display()
            );
        }
        return read_config(path);
    }

    let local_path = cwd.join(CONFIG_FILE_NAME);
    if local_path.exists() {
        return read_config(&local_path);
    }

    tracing::debug!("no config file found, using built-in rules");
    Ok(RulesConfig::default())
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!(
            "refusing to overwrite existing config file: {}",
            path.display()
        );
    }

    let content = default_config_toml()?;
    fs::write(path, content).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&RulesConfig::default()).context("failed to serialize default config")
}

fn read_config(path: &Path) -> Result<RulesConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed reading config file {}", path.display()))?;
    let config = toml::from_str::<RulesConfig>(&content)
        .with_context(|| format!("failed parsing config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded rules config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceStatus;
    use crate::calendar::AcademicTerm;

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = default_config_toml().unwrap();
        let parsed: RulesConfig = toml::from_str(&text).unwrap();
        let rules = parsed.into_rules().unwrap();
        assert_eq!(rules.grade_table, GradeTable::default());
        assert_eq!(rules.weights, AssessmentWeights::default());
        assert_eq!(rules.calendar, AcademicCalendar::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[attendance]\nexcellent = 95.0\n").unwrap();

        let rules = load_rules(None, dir.path()).unwrap();
        assert_eq!(rules.attendance.excellent, 95.0);
        assert_eq!(rules.attendance.good, 75.0);
        assert_eq!(rules.attendance.classify_rate(92.0), AttendanceStatus::Good);
        assert_eq!(rules.grade_table.bands().len(), 8);
        assert_eq!(rules.calendar.definition(AcademicTerm::Second).start_month, 1);
    }

    #[test]
    fn example_file_matches_defaults() {
        let parsed: RulesConfig =
            toml::from_str(include_str!("../school-rules.example.toml")).unwrap();
        let rules = parsed.into_rules().unwrap();
        assert_eq!(rules.grade_table, GradeTable::default());
        assert_eq!(rules.calendar, AcademicCalendar::default());
        assert_eq!(rules.weights, AssessmentWeights::default());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn no_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let rules = load_rules(None, dir.path()).unwrap();
        assert_eq!(rules.weights.exam, 0.70);
    }

    #[test]
    fn invalid_weights_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, "[weights]\nca1 = 0.5\nca2 = 0.5\nexam = 0.5\n").unwrap();
        assert!(load_rules(Some(&path), dir.path()).is_err());
    }

    #[test]
    fn write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        write_default_config(&path).unwrap();
        assert!(write_default_config(&path).is_err());
    }
}
