//! Day-of-week, time-of-day and offset parsing.
//!
//! All positions are expressed in *minute-of-week* space, with
//! Sunday 00:00 = 0 and Saturday 23:59 = `MINUTES_PER_WEEK - 1`.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;

/// A day of week as written by the operator: `0`-`6` (Sunday = 0) or a
/// weekday name (`"Monday"`, `"mon"`, any case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DaySpec {
    Index(u8),
    Name(String),
}

impl DaySpec {
    /// Days since Sunday, or `None` if the value is not a valid day.
    pub fn days_from_sunday(&self) -> Option<u32> {
        match self {
            DaySpec::Index(i) if *i <= 6 => Some(u32::from(*i)),
            DaySpec::Index(_) => None,
            DaySpec::Name(name) => name
                .trim()
                .parse::<Weekday>()
                .ok()
                .map(|d| d.num_days_from_sunday()),
        }
    }
}

impl From<Weekday> for DaySpec {
    fn from(day: Weekday) -> Self {
        DaySpec::Name(day.to_string())
    }
}

impl fmt::Display for DaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaySpec::Index(i) => write!(f, "{i}"),
            DaySpec::Name(name) => f.write_str(name),
        }
    }
}

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_time_of_day(s: &str) -> Option<u32> {
    let time = NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()?;
    Some(time.hour() * 60 + time.minute())
}

/// Parse a fixed UTC offset: `"+09:00"`, `"-0530"`, `"Z"`, `"UTC"`.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest.get(..2)?, rest.get(2..)?),
    };
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Convert a minute-of-week written in `offset` to the same instant's
/// minute-of-week in UTC.
pub fn to_utc_minute_of_week(local: u32, offset: &FixedOffset) -> u32 {
    let shift = i64::from(offset.local_minus_utc() / 60);
    (i64::from(local) - shift).rem_euclid(i64::from(MINUTES_PER_WEEK)) as u32
}

/// Position of `now` in minute-of-week space, as seen in `offset`.
pub fn minute_of_week<Tz: TimeZone>(now: &DateTime<Tz>, offset: &FixedOffset) -> u32 {
    let local = now.with_timezone(offset);
    local.weekday().num_days_from_sunday() * MINUTES_PER_DAY + local.hour() * 60 + local.minute()
}
