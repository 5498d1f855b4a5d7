//! School grade <-> graduation year conversion.
//!
//! A grade offset counts years until graduation: 0 is the final (12th)
//! grade, 12 is kindergarten. The school year rolls over on the graduation
//! date, so the "current" graduation year depends on the as-of date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Month/day on which the school year rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationDate {
    pub month: u32,
    pub day: u32,
}

impl Default for GraduationDate {
    fn default() -> Self {
        Self { month: 6, day: 1 }
    }
}

/// Highest offset that maps to a named grade (kindergarten).
const MAX_GRADE_OFFSET: i32 = 12;

impl GraduationDate {
    /// Graduation year of the class currently in its final grade.
    pub fn current_graduation_year(&self, as_of: NaiveDate) -> i32 {
        let year = as_of.year();
        match NaiveDate::from_ymd_opt(year, self.month, self.day) {
            Some(rollover) if as_of >= rollover => year + 1,
            Some(_) => year,
            // Invalid month/day (e.g. Feb 30) - treat the whole year as before rollover
            None => year,
        }
    }

    /// `None` when the year would overflow.
    pub fn graduation_year_from_offset(&self, offset: i32, as_of: NaiveDate) -> Option<i32> {
        self.current_graduation_year(as_of).checked_add(offset)
    }

    pub fn offset_from_graduation_year(&self, graduation_year: i32, as_of: NaiveDate) -> Option<i32> {
        graduation_year.checked_sub(self.current_graduation_year(as_of))
    }
}

/// Display name for a grade offset, e.g. "12th Grade", "Kindergarten".
pub fn format_grade(offset: i32) -> Option<String> {
    match offset {
        0..=11 => {
            let grade = 12 - offset;
            Some(format!("{}{} Grade", grade, ordinal_suffix(grade)))
        }
        MAX_GRADE_OFFSET => Some("Kindergarten".to_string()),
        _ => None,
    }
}

fn ordinal_suffix(n: i32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_current_graduation_year_rolls_over() {
        let grad = GraduationDate::default();
        assert_eq!(grad.current_graduation_year(date(2024, 5, 31)), 2024);
        assert_eq!(grad.current_graduation_year(date(2024, 6, 1)), 2025);
        assert_eq!(grad.current_graduation_year(date(2024, 12, 15)), 2025);
    }

    #[test]
    fn test_offset_round_trip_at_boundary() {
        let grad = GraduationDate::default();
        let as_of = date(2024, 3, 1);
        assert_eq!(grad.graduation_year_from_offset(0, as_of), Some(2024));
        assert_eq!(grad.graduation_year_from_offset(4, as_of), Some(2028));
        assert_eq!(grad.offset_from_graduation_year(2028, as_of), Some(4));
    }

    #[test]
    fn test_extreme_offsets_do_not_overflow() {
        let grad = GraduationDate::default();
        let as_of = date(2024, 3, 1);
        assert_eq!(grad.graduation_year_from_offset(i32::MAX, as_of), None);
        assert_eq!(grad.offset_from_graduation_year(i32::MIN, as_of), None);
    }

    #[test]
    fn test_format_grade() {
        assert_eq!(format_grade(0).as_deref(), Some("12th Grade"));
        assert_eq!(format_grade(9).as_deref(), Some("3rd Grade"));
        assert_eq!(format_grade(10).as_deref(), Some("2nd Grade"));
        assert_eq!(format_grade(11).as_deref(), Some("1st Grade"));
        assert_eq!(format_grade(12).as_deref(), Some("Kindergarten"));
        assert_eq!(format_grade(-1), None);
    }
}
