//! Three-term school calendar.
//!
//! An academic year starts with the First Term in September of year `Y`
//! and ends with the Third Term in July of `Y + 1`; the month(s) between
//! the end of the Third Term and the next September are the long vacation.
//! Each term closes with a break occupying its final `break_weeks` weeks.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AcademicError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AcademicTerm {
    First,
    Second,
    Third,
}

impl AcademicTerm {
    pub const ALL: [AcademicTerm; 3] = [Self::First, Self::Second, Self::Third];

    pub fn number(&self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::First => "First Term",
            Self::Second => "Second Term",
            Self::Third => "Third Term",
        }
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub term: AcademicTerm,
    pub start_month: u32,
    pub end_month: u32,
    pub break_name: String,
    pub break_weeks: u32,
}

pub fn default_terms() -> Vec<TermDefinition> {
    vec![
        TermDefinition {
            term: AcademicTerm::First,
            start_month: 9,
            end_month: 12,
            break_name: "Christmas Break".to_string(),
            break_weeks: 3,
        },
        TermDefinition {
            term: AcademicTerm::Second,
            start_month: 1,
            end_month: 4,
            break_name: "Easter Break".to_string(),
            break_weeks: 2,
        },
        TermDefinition {
            term: AcademicTerm::Third,
            start_month: 5,
            end_month: 7,
            break_name: "Long Vacation".to_string(),
            break_weeks: 4,
        },
    ]
}

pub static DEFAULT_CALENDAR: Lazy<AcademicCalendar> = Lazy::new(|| AcademicCalendar {
    terms: default_terms(),
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermResolution {
    pub term: AcademicTerm,
    pub academic_year_start: i32,
    pub academic_year_label: String,
    pub on_break: bool,
    pub break_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcademicCalendar {
    terms: Vec<TermDefinition>,
}

impl Default for AcademicCalendar {
    fn default() -> Self {
        DEFAULT_CALENDAR.clone()
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

impl AcademicCalendar {
    pub fn new(mut terms: Vec<TermDefinition>) -> Result<Self> {
        terms.sort_by_key(|t| t.term);
        let order: Vec<AcademicTerm> = terms.iter().map(|t| t.term).collect();
        if order != AcademicTerm::ALL {
            return Err(AcademicError::InvalidCalendar(
                "exactly one definition per term is required".to_string(),
            ));
        }
        for t in &terms {
            if !(1..=12).contains(&t.start_month) || !(1..=12).contains(&t.end_month) {
                return Err(AcademicError::InvalidCalendar(format!(
                    "{} months must be between 1 and 12",
                    t.term
                )));
            }
            if t.break_weeks > 4 {
                return Err(AcademicError::InvalidCalendar(format!(
                    "{} break of {} weeks does not fit in its closing month",
                    t.term, t.break_weeks
                )));
            }
        }

        let calendar = Self { terms };
        let first_start = calendar.terms[0].start_month;
        let mut previous_end: Option<u32> = None;
        for t in &calendar.terms {
            let start = calendar.offset(t.start_month);
            let end = calendar.offset(t.end_month);
            if end < start {
                return Err(AcademicError::InvalidCalendar(format!(
                    "{} ends before it starts within the academic year",
                    t.term
                )));
            }
            if let Some(prev) = previous_end {
                if start != prev + 1 {
                    return Err(AcademicError::InvalidCalendar(format!(
                        "{} must start in the month after the previous term ends",
                        t.term
                    )));
                }
            }
            previous_end = Some(end);
        }
        tracing::debug!(first_start, "academic calendar validated");
        Ok(calendar)
    }

    pub fn terms(&self) -> &[TermDefinition] {
        &self.terms
    }

    pub fn definition(&self, term: AcademicTerm) -> &TermDefinition {
        &self.terms[usize::from(term.number() - 1)]
    }

    /// Months since the academic year began: September is 0 in the default calendar.
    fn offset(&self, month: u32) -> u32 {
        (month + 12 - self.terms[0].start_month) % 12
    }

    pub fn academic_year_start(&self, date: NaiveDate) -> i32 {
        if date.month() >= self.terms[0].start_month {
            date.year()
        } else {
            date.year() - 1
        }
    }

    pub fn academic_year_label(&self, date: NaiveDate) -> String {
        let start = self.academic_year_start(date);
        format!("{}/{}", start, start + 1)
    }

    pub fn resolve(&self, date: NaiveDate) -> TermResolution {
        let academic_year_start = self.academic_year_start(date);
        let offset = self.offset(date.month());

        let containing = self
            .terms
            .iter()
            .find(|t| self.offset(t.start_month) <= offset && offset <= self.offset(t.end_month));

        let (definition, on_break) = match containing {
            Some(t) => {
                // The break covers the last `7 * break_weeks` days of the closing month.
                let in_break = t.break_weeks > 0
                    && date.month() == t.end_month
                    && last_day_of_month(date.year(), date.month())
                        .map(|last| date.day().saturating_add(t.break_weeks.saturating_mul(7)) > last.day())
                        .unwrap_or(false);
                (t, in_break)
            }
            // Between the last term and the next academic year.
            None => (&self.terms[self.terms.len() - 1], true),
        };

        TermResolution {
            term: definition.term,
            academic_year_start,
            academic_year_label: format!("{}/{}", academic_year_start, academic_year_start + 1),
            on_break,
            break_name: on_break.then(|| definition.break_name.clone()),
        }
    }

    /// First and last calendar day of `term` in the academic year starting in `start_year`.
    pub fn term_date_range(&self, term: AcademicTerm, start_year: i32) -> Result<(NaiveDate, NaiveDate)> {
        let def = self.definition(term);
        let year_for = |month: u32| {
            if month >= self.terms[0].start_month {
                start_year
            } else {
                start_year + 1
            }
        };
        let start_year_of_term = year_for(def.start_month);
        let end_year_of_term = year_for(def.end_month);
        let start = NaiveDate::from_ymd_opt(start_year_of_term, def.start_month, 1);
        let end = last_day_of_month(end_year_of_term, def.end_month);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(AcademicError::InvalidCalendar(format!(
                "{term} has no representable dates in {start_year}"
            ))),
        }
    }
}

pub fn resolve_current_term(today: NaiveDate) -> TermResolution {
    DEFAULT_CALENDAR.resolve(today)
}

pub fn academic_year_label(date: NaiveDate) -> String {
    DEFAULT_CALENDAR.academic_year_label(date)
}

pub fn term_date_range(term: AcademicTerm, start_year: i32) -> Result<(NaiveDate, NaiveDate)> {
    DEFAULT_CALENDAR.term_date_range(term, start_year)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicHoliday {
    pub date: NaiveDate,
    pub name: &'static str,
}

const FIXED_HOLIDAYS: [(u32, u32, &str); 7] = [
    (1, 1, "New Year's Day"),
    (5, 1, "Workers' Day"),
    (5, 27, "Children's Day"),
    (6, 12, "Democracy Day"),
    (10, 1, "Independence Day"),
    (12, 25, "Christmas Day"),
    (12, 26, "Boxing Day"),
];

/// Fixed-date public holidays. These are informational and never change
/// term resolution or school-day counts.
pub fn public_holidays(year: i32) -> Vec<PublicHoliday> {
    FIXED_HOLIDAYS
        .iter()
        .filter_map(|(month, day, name)| {
            NaiveDate::from_ymd_opt(year, *month, *day).map(|date| PublicHoliday {
                date,
                name: *name,
            })
        })
        .collect()
}

pub fn is_public_holiday(date: NaiveDate) -> Option<&'static str> {
    FIXED_HOLIDAYS
        .iter()
        .find(|(month, day, _)| date.month() == *month && date.day() == *day)
        .map(|(_, _, name)| *name)
}

pub fn is_school_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays from `start` to `end`, both inclusive.
pub fn school_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
        .filter(|d| is_school_day(*d))
}

pub fn count_school_days(start: NaiveDate, end: NaiveDate) -> u32 {
    school_days(start, end).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        assert_eq!(last_day_of_month(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(last_day_of_month(2025, 2), Some(date(2025, 2, 28)));
        assert_eq!(last_day_of_month(1900, 2), Some(date(1900, 2, 28)));
        assert_eq!(last_day_of_month(2024, 12), Some(date(2024, 12, 31)));
        assert_eq!(last_day_of_month(2024, 13), None);
    }

    #[test]
    fn october_is_first_term_of_the_new_year() {
        let r = resolve_current_term(date(2024, 10, 15));
        assert_eq!(r.term, AcademicTerm::First);
        assert_eq!(r.academic_year_label, "2024/2025");
        assert!(!r.on_break);
        assert_eq!(r.break_name, None);
    }

    #[test]
    fn february_wraps_back_to_previous_year() {
        let r = resolve_current_term(date(2025, 2, 1));
        assert_eq!(r.term, AcademicTerm::Second);
        assert_eq!(r.academic_year_label, "2024/2025");
        assert_eq!(r.academic_year_start, 2024);
    }

    #[test]
    fn june_is_third_term() {
        let r = resolve_current_term(date(2025, 6, 3));
        assert_eq!(r.term, AcademicTerm::Third);
        assert_eq!(r.academic_year_label, "2024/2025");
    }

    #[test]
    fn trailing_weeks_of_a_term_are_its_break() {
        let r = resolve_current_term(date(2024, 12, 20));
        assert_eq!(r.term, AcademicTerm::First);
        assert!(r.on_break);
        assert_eq!(r.break_name.as_deref(), Some("Christmas Break"));

        // Christmas break is the last 21 days of December: 11th onward.
        assert!(!resolve_current_term(date(2024, 12, 10)).on_break);
        assert!(resolve_current_term(date(2024, 12, 11)).on_break);

        let easter = resolve_current_term(date(2025, 4, 25));
        assert_eq!(easter.term, AcademicTerm::Second);
        assert!(easter.on_break);
    }

    #[test]
    fn august_is_long_vacation_of_the_closing_year() {
        let r = resolve_current_term(date(2025, 8, 14));
        assert_eq!(r.term, AcademicTerm::Third);
        assert!(r.on_break);
        assert_eq!(r.academic_year_label, "2024/2025");
        assert_eq!(r.break_name.as_deref(), Some("Long Vacation"));

        let september = resolve_current_term(date(2025, 9, 1));
        assert_eq!(september.term, AcademicTerm::First);
        assert_eq!(september.academic_year_label, "2025/2026");
    }

    #[test]
    fn term_ranges_span_the_right_calendar_years() {
        let (start, end) = term_date_range(AcademicTerm::First, 2024).unwrap();
        assert_eq!((start, end), (date(2024, 9, 1), date(2024, 12, 31)));
        let (start, end) = term_date_range(AcademicTerm::Second, 2024).unwrap();
        assert_eq!((start, end), (date(2025, 1, 1), date(2025, 4, 30)));
        let (_, end) = term_date_range(AcademicTerm::Third, 2024).unwrap();
        assert_eq!(end, date(2025, 7, 31));
    }

    #[test]
    fn holidays_are_informational() {
        assert_eq!(is_public_holiday(date(2024, 10, 1)), Some("Independence Day"));
        assert_eq!(is_public_holiday(date(2024, 10, 2)), None);
        assert_eq!(public_holidays(2025).len(), 7);
        // Independence Day still resolves as an ordinary First Term day.
        assert!(!resolve_current_term(date(2024, 10, 1)).on_break);
    }

    #[test]
    fn school_days_skip_weekends() {
        // Mon 2024-09-09 .. Sun 2024-09-22: two full weeks.
        assert_eq!(count_school_days(date(2024, 9, 9), date(2024, 9, 22)), 10);
        assert_eq!(count_school_days(date(2024, 9, 14), date(2024, 9, 15)), 0);
        assert_eq!(count_school_days(date(2024, 9, 20), date(2024, 9, 9)), 0);
        let first: Vec<NaiveDate> = school_days(date(2024, 9, 6), date(2024, 9, 9)).collect();
        assert_eq!(first, vec![date(2024, 9, 6), date(2024, 9, 9)]);
    }

    #[test]
    fn calendar_rejects_gaps_between_terms() {
        let mut terms = default_terms();
        terms[1].start_month = 2;
        assert!(matches!(
            AcademicCalendar::new(terms),
            Err(AcademicError::InvalidCalendar(_))
        ));

        let mut terms = default_terms();
        terms.pop();
        assert!(AcademicCalendar::new(terms).is_err());

        assert!(AcademicCalendar::new(default_terms()).is_ok());
    }
}
