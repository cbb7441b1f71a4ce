//! Calendar windows used by analytics
//!
//! All windows are half-open: `[start, end)`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// A half-open time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// The calendar day containing `date`
pub fn day_window(date: NaiveDate) -> Window {
    let start = start_of_day(date);
    Window::new(start, start + Duration::days(1))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `offset` months away (negative goes back)
pub fn shift_month(date: NaiveDate, offset: i32) -> NaiveDate {
    let months = date.year() * 12 + date.month0() as i32 + offset;
    let year = months.div_euclid(12);
    let month = months.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| month_start(date))
}

/// The calendar month containing `date`
pub fn month_window(date: NaiveDate) -> Window {
    Window::new(
        start_of_day(month_start(date)),
        start_of_day(shift_month(date, 1)),
    )
}

/// Indian fiscal year (1 April to 31 March) containing `date`
pub fn fiscal_year_window(date: NaiveDate) -> Window {
    let start_year = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    let start = NaiveDate::from_ymd_opt(start_year, 4, 1).unwrap_or(date);
    let end = NaiveDate::from_ymd_opt(start_year + 1, 4, 1).unwrap_or(date);
    Window::new(start_of_day(start), start_of_day(end))
}

/// Label like "FY 2024-25"
pub fn fiscal_year_label(date: NaiveDate) -> String {
    let window = fiscal_year_window(date);
    let start = window.start.year();
    format!("FY {}-{:02}", start, (start + 1) % 100)
}

/// Whether `date` falls in the last quarter of the fiscal year (Jan-Mar)
pub fn is_tax_season(date: NaiveDate) -> bool {
    date.month() <= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_shift_month_wraps_years() {
        assert_eq!(shift_month(d(2025, 1, 20), -1), d(2024, 12, 1));
        assert_eq!(shift_month(d(2024, 12, 5), 1), d(2025, 1, 1));
        assert_eq!(shift_month(d(2025, 3, 31), -3), d(2024, 12, 1));
    }

    #[test]
    fn test_month_window() {
        let w = month_window(d(2024, 2, 10));
        assert!(w.contains(start_of_day(d(2024, 2, 29))));
        assert!(!w.contains(start_of_day(d(2024, 3, 1))));
        assert_eq!(w.end, start_of_day(d(2024, 3, 1)));
    }

    #[test]
    fn test_fiscal_year() {
        let w = fiscal_year_window(d(2025, 2, 14));
        assert_eq!(w.start, start_of_day(d(2024, 4, 1)));
        assert_eq!(w.end, start_of_day(d(2025, 4, 1)));
        assert_eq!(fiscal_year_label(d(2025, 2, 14)), "FY 2024-25");
        assert_eq!(fiscal_year_label(d(2025, 4, 1)), "FY 2025-26");
        assert!(is_tax_season(d(2025, 3, 31)));
        assert!(!is_tax_season(d(2025, 4, 1)));
    }
}
