// src/settlement/period.rs

//! Calendar periods used to tag credits and to key weekly quizzes.
//!
//! All periods are computed in UTC.

use chrono::{DateTime, Datelike, Utc};

/// Month, year and season a credit is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub month: i32,
    pub year: i32,
    pub season_year: i32,
}

impl Period {
    pub fn at(at: DateTime<Utc>) -> Self {
        let month = at.month();
        let year = at.year();
        Self {
            month: month as i32,
            year,
            season_year: season_year(month, year),
        }
    }
}

/// Seasons run August to July and are named after the year they start in.
pub fn season_year(month: u32, year: i32) -> i32 {
    if month >= 8 { year } else { year - 1 }
}

/// ISO-8601 week a quiz attempt belongs to.
///
/// The ISO week-year is carried alongside the week number so that week 1 of
/// consecutive years never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuizWeek {
    pub year: i32,
    pub week: i32,
}

impl QuizWeek {
    pub fn at(at: DateTime<Utc>) -> Self {
        let iso = at.iso_week();
        Self {
            year: iso.year(),
            week: iso.week() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn season_starts_in_august() {
        assert_eq!(season_year(8, 2025), 2025);
        assert_eq!(season_year(12, 2025), 2025);
        assert_eq!(season_year(1, 2026), 2025);
        assert_eq!(season_year(7, 2026), 2025);
    }

    #[test]
    fn period_at_derives_season() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        assert_eq!(Period::at(at), Period { month: 3, year: 2026, season_year: 2025 });
    }

    #[test]
    fn quiz_week_uses_iso_week_year() {
        // 2026-01-01 is a Thursday: ISO week 1 of 2026.
        let new_year = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(QuizWeek::at(new_year), QuizWeek { year: 2026, week: 1 });

        // 2027-01-01 is a Friday: still ISO week 53 of 2026.
        let next = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(QuizWeek::at(next), QuizWeek { year: 2026, week: 53 });
    }
}
