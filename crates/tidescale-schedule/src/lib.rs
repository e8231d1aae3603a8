//! tidescale-schedule — weekly windows and active-window selection.
//!
//! A [`Window`] is a recurring weekly interval (start day/time to end
//! day/time, optionally in a fixed UTC offset) carrying optional
//! replica and metric overrides. [`select_active`] picks at most one
//! window for a given instant.
//!
//! # Selection rule
//!
//! ```text
//! sort windows by start as UTC minute-of-week, stable, Sunday 00:00 = 0
//! for w in sorted:
//!     if w contains now: return w      // first match wins
//! return none
//! ```
//!
//! Overlapping windows are not merged and not rejected: the window that
//! starts earliest in the week is active. Malformed day, time, or offset
//! values fail the evaluation with a [`ScheduleError`].

pub mod error;
pub mod matcher;
pub mod time;
pub mod window;

pub use error::{ScheduleError, ScheduleResult};
pub use matcher::select_active;
pub use time::DaySpec;
pub use window::{Window, WindowBounds};
