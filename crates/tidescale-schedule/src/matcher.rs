//! Active-window selection.
//!
//! Windows are stable-sorted by their start, expressed as a UTC
//! minute-of-week with Sunday 00:00 as the origin, then scanned in order.
//! The first window containing `now` wins and the scan stops there, so
//! overlapping windows never combine: the earliest-starting one is active,
//! and windows with the same start keep their input order. Windows written
//! in different offsets are ranked by the instant they start.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ScheduleResult;
use crate::window::Window;

/// Select the single active window for `now`, if any.
///
/// Every window is parsed before the scan, so one malformed window fails
/// the whole evaluation even if an earlier window would have matched.
pub fn select_active(now: DateTime<Utc>, windows: &[Window]) -> ScheduleResult<Option<&Window>> {
    let mut ordered = windows
        .iter()
        .map(|w| w.start_key().map(|key| (key, w)))
        .collect::<ScheduleResult<Vec<_>>>()?;
    // `sort_by_key` is stable.
    ordered.sort_by_key(|(key, _)| *key);

    for (_, window) in ordered {
        if window.contains(now)? {
            debug!(window = %window.name, %now, "window active");
            return Ok(Some(window));
        }
    }

    Ok(None)
}
