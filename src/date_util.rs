use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Heatmap column order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.map(|d| d - Duration::days(1))
}

/// Parse a store timestamp. Values carrying an offset are normalized to UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a calendar day, accepting either `YYYY-MM-DD` or a full timestamp.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

/// Every calendar day in `[start, end]`; empty when `start > end`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2025, 1), Some(d(2025, 1, 31)));
        assert_eq!(last_day_of_month(2025, 2), Some(d(2025, 2, 28)));
        assert_eq!(last_day_of_month(2024, 2), Some(d(2024, 2, 29))); // Leap year
        assert_eq!(last_day_of_month(2025, 12), Some(d(2025, 12, 31)));
        assert_eq!(last_day_of_month(2025, 13), None);
    }

    #[test]
    fn test_parse_day_plain_and_timestamp() {
        assert_eq!(parse_day("2024-01-03"), Some(d(2024, 1, 3)));
        assert_eq!(parse_day("2024-01-03T08:15:00"), Some(d(2024, 1, 3)));
        assert_eq!(parse_day("2024-01-03T08:15:00.123456+00:00"), Some(d(2024, 1, 3)));
        assert_eq!(parse_day("yesterday"), None);
    }

    #[test]
    fn test_parse_timestamp_normalizes_offset() {
        let ts = parse_timestamp("2024-01-03T23:30:00-02:00").unwrap();
        assert_eq!(ts.date(), d(2024, 1, 4));
        assert_eq!(ts.format("%H:%M").to_string(), "01:30");
    }

    #[test]
    fn test_parse_timestamp_postgres_short_offset() {
        let ts = parse_timestamp("2024-05-01 10:00:00.5+00").unwrap();
        assert_eq!(ts.date(), d(2024, 5, 1));
    }

    #[test]
    fn test_parse_timestamp_naive() {
        let ts = parse_timestamp("2024-05-01 10:00:00").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 10:00:00");
    }

    #[test]
    fn test_days_inclusive() {
        let days: Vec<_> = days_inclusive(d(2024, 2, 27), d(2024, 3, 1)).collect();
        assert_eq!(days, vec![d(2024, 2, 27), d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1)]);
        assert_eq!(days_inclusive(d(2024, 3, 2), d(2024, 3, 1)).count(), 0);
    }

    #[test]
    fn test_weekday_order() {
        let names: Vec<_> = WEEKDAYS.iter().map(|w| weekday_name(*w)).collect();
        assert_eq!(names.first(), Some(&"Monday"));
        assert_eq!(names.last(), Some(&"Sunday"));
    }
}
