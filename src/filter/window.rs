use std::fmt;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, Weekday};
use regex::Regex;
use serde::Serialize;

use crate::date_util::last_day_of_month;
use crate::error::{Error, Result};

static RE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})?\.\.(\d{4}-\d{2}-\d{2})?$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_ROLLING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[dD]$").unwrap());

/// Inclusive calendar-day window applied to `DailyRecord.date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A window no date falls outside of.
    pub fn everything() -> Self {
        Self::new(NaiveDate::MIN, NaiveDate::MAX)
    }

    /// The data's own bounds, or `everything()` when there is no data.
    pub fn from_bounds(bounds: Option<(NaiveDate, NaiveDate)>) -> Self {
        match bounds {
            Some((start, end)) => Self::new(start, end),
            None => Self::everything(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Parse a window expression.
    ///
    /// Supported formats:
    /// - `all`: the data bounds
    /// - `14d`: the last N days, ending at the latest record (today if none)
    /// - `2024-01-01..2024-01-31`: explicit range; either side may be omitted
    /// - `2024-01`: calendar month
    /// - `2024-W05`: ISO week
    /// - `2024-01-15`: single day
    ///
    /// `bounds` are the earliest and latest record dates.
    pub fn parse(s: &str, bounds: Option<(NaiveDate, NaiveDate)>) -> Result<Self> {
        let s = s.trim();
        let data = Self::from_bounds(bounds);

        if s.eq_ignore_ascii_case("all") {
            return Ok(data);
        }

        if let Some(caps) = RE_ROLLING.captures(s) {
            let n: i64 = caps[1]
                .parse()
                .map_err(|_| Error::WindowParse(format!("day count out of range: {s}")))?;
            if n == 0 {
                return Err(Error::WindowParse(format!("day count must be positive: {s}")));
            }
            let anchor = bounds
                .map(|(_, end)| end)
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            let start = Duration::try_days(n - 1)
                .and_then(|span| anchor.checked_sub_signed(span))
                .unwrap_or(NaiveDate::MIN);
            return Ok(Self::new(start, anchor));
        }

        if let Some(caps) = RE_RANGE.captures(s) {
            let start = match caps.get(1) {
                Some(m) => parse_ymd(m.as_str())?,
                None => data.start,
            };
            let end = match caps.get(2) {
                Some(m) => parse_ymd(m.as_str())?,
                None => data.end,
            };
            if start > end {
                return Err(Error::WindowParse(format!("start is after end: {s}")));
            }
            return Ok(Self::new(start, end));
        }

        if RE_DAY.is_match(s) {
            let day = parse_ymd(s)?;
            return Ok(Self::new(day, day));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let (year, week) = numeric_parts(&caps, s)?;
            let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
                .ok_or_else(|| Error::WindowParse(format!("no such ISO week: {s}")))?;
            return Ok(Self::new(start, start + Duration::days(6)));
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let (year, month) = numeric_parts(&caps, s)?;
            let start = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| Error::WindowParse(format!("no such month: {s}")))?;
            let end = last_day_of_month(year, month)
                .ok_or_else(|| Error::WindowParse(format!("no such month: {s}")))?;
            return Ok(Self::new(start, end));
        }

        Err(Error::WindowParse(format!("unrecognized window: {s}")))
    }

    /// Narrow one or both ends, keeping the rest of the window.
    pub fn with_bounds(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self::new(start.unwrap_or(self.start), end.unwrap_or(self.end))
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::everything() {
            return f.write_str("all dates");
        }
        write!(f, "{}..{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

fn numeric_parts(caps: &regex::Captures<'_>, s: &str) -> Result<(i32, u32)> {
    let bad = || Error::WindowParse(format!("unrecognized window: {s}"));
    let year = caps[1].parse().map_err(|_| bad())?;
    let part = caps[2].parse().map_err(|_| bad())?;
    Ok((year, part))
}

pub fn parse_ymd(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::WindowParse(format!("invalid date (expected YYYY-MM-DD): {s}")))
}
