//! Season and date-range helpers
//!
//! Football seasons span two calendar years. Remote sources address them with
//! a four-digit code built from the two-digit year halves ("9900" for the
//! 1999/2000 season), while human-facing labels use the full years.

use chrono::{Days, NaiveDate};

/// A football season starting in `start_year` and ending the year after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Four-digit source code, e.g. "9900" for 1999/2000
    pub fn code(&self) -> String {
        format!(
            "{:02}{:02}",
            self.start_year.rem_euclid(100),
            (self.start_year + 1).rem_euclid(100)
        )
    }

    /// Human-facing label, e.g. "1999/2000"
    pub fn label(&self) -> String {
        format!("{}/{}", self.start_year, self.start_year + 1)
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Seasons covering the date range, inclusive
///
/// The season before `start` is included because early-season dates belong to
/// a season that started the previous calendar year.
pub fn seasons_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = Season> {
    use chrono::Datelike;
    (start.year() - 1..=end.year()).map(Season::new)
}

/// Every day from `start` to `end`, inclusive; empty when `end < start`
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let span = if end < start {
        0
    } else {
        (end - start).num_days() as u64 + 1
    };
    (0..span).filter_map(move |offset| start.checked_add_days(Days::new(offset)))
}
