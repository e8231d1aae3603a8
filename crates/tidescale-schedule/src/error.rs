//! Configuration errors raised while evaluating windows.

use thiserror::Error;

/// Result type alias for window evaluation.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A window whose fields cannot be interpreted.
///
/// Evaluation never treats a malformed window as "not matching"; the
/// error is returned to the caller instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("window {window}: invalid {field} {value:?} (expected 0-6 or a weekday name)")]
    InvalidDay {
        window: String,
        field: &'static str,
        value: String,
    },

    #[error("window {window}: invalid {field} {value:?} (expected HH:MM)")]
    InvalidTime {
        window: String,
        field: &'static str,
        value: String,
    },

    #[error("window {window}: invalid utc_offset {value:?} (expected +HH:MM, -HH:MM or UTC)")]
    InvalidOffset { window: String, value: String },

    #[error("window {window}: start and end are the same instant")]
    EmptyWindow { window: String },
}
