//! Calendar arithmetic on local wall-clock values.
//!
//! Months are half-open: a month runs from [`start_of_month`] up to, but not
//! including, [`end_of_month`]. The month filter and [`days_in_month`] both
//! rely on that single convention.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const MILLISECONDS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// First instant of the month containing `date`.
pub fn start_of_month(date: NaiveDate) -> NaiveDateTime {
    first_day(date).and_time(NaiveTime::MIN)
}

/// First instant of the month following the one containing `date`.
///
/// This is an exclusive upper bound.
pub fn end_of_month(date: NaiveDate) -> NaiveDateTime {
    next_month(date).and_time(NaiveTime::MIN)
}

/// Midnight of the calendar day of `datetime`.
pub fn start_of_day(datetime: NaiveDateTime) -> NaiveDateTime {
    datetime.date().and_time(NaiveTime::MIN)
}

/// Number of calendar days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let days = (next_month(date) - first_day(date)).num_days();
    days as u32
}

pub fn days_in_milliseconds(days: i64) -> i64 {
    days * MILLISECONDS_PER_DAY
}

/// First day of the month containing `date`.
pub fn first_day(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month before the one containing `date`.
pub fn previous_month(date: NaiveDate) -> NaiveDate {
    first_day(first_day(date) - Duration::days(1))
}

/// First day of the month after the one containing `date`.
pub fn next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

/// Whether `datetime` falls inside the month containing `month`.
pub fn contains(month: NaiveDate, datetime: NaiveDateTime) -> bool {
    datetime >= start_of_month(month) && datetime < end_of_month(month)
}

/// Calendar day number plus the fraction of that day already elapsed.
///
/// An entry at 18:00 on the 3rd maps to `3.75`.
pub fn day_of_month_fraction(datetime: NaiveDateTime) -> f64 {
    let elapsed = (datetime - start_of_day(datetime)).num_milliseconds();
    let sub_millis = (datetime.nanosecond() % 1_000_000) as f64 / 1_000_000.0;
    datetime.day() as f64 + (elapsed as f64 + sub_millis) / days_in_milliseconds(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn month_bounds_are_half_open() {
        let d = date(2024, 3, 17);
        assert_eq!(start_of_month(d), at(2024, 3, 1, 0, 0));
        assert_eq!(end_of_month(d), at(2024, 4, 1, 0, 0));
        assert!(contains(d, at(2024, 3, 31, 23, 59)));
        assert!(contains(d, at(2024, 3, 1, 0, 0)));
        assert!(!contains(d, at(2024, 4, 1, 0, 0)));
        assert!(!contains(d, at(2024, 2, 29, 23, 59)));
    }

    #[test]
    fn end_of_december_rolls_into_next_year() {
        assert_eq!(end_of_month(date(2023, 12, 5)), at(2024, 1, 1, 0, 0));
        assert_eq!(next_month(date(2023, 12, 31)), date(2024, 1, 1));
        assert_eq!(previous_month(date(2024, 1, 20)), date(2023, 12, 1));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2023, 2, 10)), 28);
        assert_eq!(days_in_month(date(1900, 2, 1)), 28);
        assert_eq!(days_in_month(date(2000, 2, 1)), 29);
        assert_eq!(days_in_month(date(2024, 4, 30)), 30);
        assert_eq!(days_in_month(date(2024, 12, 1)), 31);
    }

    #[test]
    fn start_of_day_drops_time() {
        assert_eq!(start_of_day(at(2024, 5, 6, 13, 45)), at(2024, 5, 6, 0, 0));
    }

    #[test]
    fn days_to_milliseconds() {
        assert_eq!(days_in_milliseconds(0), 0);
        assert_eq!(days_in_milliseconds(1), 86_400_000);
        assert_eq!(days_in_milliseconds(31), 2_678_400_000);
    }

    #[test]
    fn fractional_day_orders_entries_within_a_day() {
        let morning = day_of_month_fraction(at(2024, 5, 3, 9, 0));
        let evening = day_of_month_fraction(at(2024, 5, 3, 18, 0));
        assert!((morning - 3.375).abs() < 1e-9);
        assert!((evening - 3.75).abs() < 1e-9);
        assert!(evening > morning);
        assert_eq!(day_of_month_fraction(at(2024, 5, 1, 0, 0)), 1.0);
    }
}
