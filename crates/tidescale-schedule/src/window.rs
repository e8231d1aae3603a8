//! Weekly recurring windows.
//!
//! A window covers the half-open interval `[start, end)` in minute-of-week
//! space, evaluated in the window's UTC offset. When `end` falls before
//! `start` the window wraps across the week boundary (Saturday into
//! Sunday). A window whose start and end coincide is rejected.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use tidescale_core::MetricSpec;

use crate::error::{ScheduleError, ScheduleResult};
use crate::time::{
    DaySpec, MINUTES_PER_DAY, minute_of_week, parse_time_of_day, parse_utc_offset,
    to_utc_minute_of_week,
};

/// A weekly recurring interval carrying optional scaling overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub name: String,
    pub start_day_of_week: DaySpec,
    /// `"HH:MM"`, 24h.
    pub start_time: String,
    pub end_day_of_week: DaySpec,
    /// `"HH:MM"`, 24h. Exclusive.
    pub end_time: String,
    /// Fixed offset the day/time fields are written in. UTC when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<u32>,
    /// Replaces the whole metric list while active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricSpec>>,
}

/// Parsed interval of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: u32,
    pub end: u32,
    pub offset: FixedOffset,
}

impl WindowBounds {
    /// Whether the interval crosses the Saturday/Sunday boundary.
    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    fn contains_minute(&self, minute: u32) -> bool {
        if self.wraps() {
            minute >= self.start || minute < self.end
        } else {
            self.start <= minute && minute < self.end
        }
    }
}

impl Window {
    /// Sort key: the start as a UTC minute-of-week, so windows written in
    /// different offsets are ranked on one clock.
    pub fn start_key(&self) -> ScheduleResult<u32> {
        let start = self.day("start_day_of_week", &self.start_day_of_week)? * MINUTES_PER_DAY
            + self.time("start_time", &self.start_time)?;
        Ok(to_utc_minute_of_week(start, &self.offset()?))
    }

    /// Parse and validate every boundary field.
    pub fn bounds(&self) -> ScheduleResult<WindowBounds> {
        let start_day = self.day("start_day_of_week", &self.start_day_of_week)?;
        let start_minute = self.time("start_time", &self.start_time)?;
        let end_day = self.day("end_day_of_week", &self.end_day_of_week)?;
        let end_minute = self.time("end_time", &self.end_time)?;
        let offset = self.offset()?;

        let start = start_day * MINUTES_PER_DAY + start_minute;
        let end = end_day * MINUTES_PER_DAY + end_minute;
        if start == end {
            return Err(ScheduleError::EmptyWindow {
                window: self.name.clone(),
            });
        }

        Ok(WindowBounds { start, end, offset })
    }

    /// Whether `now` falls inside this window's recurring interval.
    ///
    /// Seconds are ignored; comparison is at minute granularity.
    pub fn contains(&self, now: DateTime<Utc>) -> ScheduleResult<bool> {
        let bounds = self.bounds()?;
        Ok(bounds.contains_minute(minute_of_week(&now, &bounds.offset)))
    }

    /// True if the window sets no override at all.
    pub fn is_noop(&self) -> bool {
        self.min_replicas.is_none() && self.max_replicas.is_none() && self.metrics.is_none()
    }

    fn day(&self, field: &'static str, spec: &DaySpec) -> ScheduleResult<u32> {
        spec.days_from_sunday().ok_or_else(|| ScheduleError::InvalidDay {
            window: self.name.clone(),
            field,
            value: spec.to_string(),
        })
    }

    fn time(&self, field: &'static str, value: &str) -> ScheduleResult<u32> {
        parse_time_of_day(value).ok_or_else(|| ScheduleError::InvalidTime {
            window: self.name.clone(),
            field,
            value: value.to_string(),
        })
    }

    fn offset(&self) -> ScheduleResult<FixedOffset> {
        let raw = self.utc_offset.as_deref().unwrap_or("UTC");
        parse_utc_offset(raw).ok_or_else(|| ScheduleError::InvalidOffset {
            window: self.name.clone(),
            value: raw.to_string(),
        })
    }
}
