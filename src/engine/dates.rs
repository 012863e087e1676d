//! Calendar helpers for streak days, challenge expiry and leaderboard periods
//!
//! All calendar math is done in UTC. Days are stored as "YYYY-MM-DD" strings
//! so they sort lexicographically in SQL.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};

/// Format a date as its storage key ("YYYY-MM-DD").
pub fn day_key(date: NaiveDate) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Parse a stored day key back into a date.
pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// The UTC calendar date for a millisecond timestamp.
pub fn date_of_ms(timestamp_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(timestamp_ms)
        .unwrap_or_else(Utc::now)
        .date_naive()
}

/// Today's UTC date.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Current time as milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Start of a date (00:00:00 UTC) in epoch milliseconds.
pub fn day_start_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// End of a date (start of the next day) in epoch milliseconds.
///
/// Used as an exclusive upper bound, so the last millisecond of the day is
/// still inside the window.
pub fn day_end_ms(date: NaiveDate) -> i64 {
    day_start_ms(date.checked_add_days(Days::new(1)).unwrap_or(date))
}

/// Inclusive first and last day of the week containing `date` (weeks start
/// on Monday).
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week = date.week(Weekday::Mon);
    (week.first_day(), week.last_day())
}

/// Inclusive first and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);
    (first, last)
}

/// Whole days from `earlier` to `later` (negative if `later` is before).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_round_trip() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let key = day_key(date);
        assert_eq!(key, "2025-03-07");
        assert_eq!(parse_day_key(&key), Some(date));
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let start = day_start_ms(date);
        let end = day_end_ms(date);
        assert_eq!(end - start, 24 * 60 * 60 * 1000);
        assert_eq!(date_of_ms(start), date);
        assert_eq!(date_of_ms(end - 1), date);
        assert_ne!(date_of_ms(end), date);
    }

    #[test]
    fn test_week_bounds_monday_start() {
        // 2025-03-07 is a Friday
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let (first, last) = week_bounds(date);
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn test_month_bounds_december_rollover() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let (first, last) = month_bounds(date);
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_days_between() {
        let a = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(days_between(a, b), 2);
        assert_eq!(days_between(b, a), -2);
    }
}
