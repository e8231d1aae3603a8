//! Availability condition bookkeeping.
//!
//! Both setters are edge triggered: they touch the status only when the
//! `Available` condition would change value, and report whether a status
//! write is needed.

use chrono::{DateTime, Utc};

use tidescale_core::{
    AVAILABLE_CONDITION, AutoscalerPhase, AutoscalerStatus, Condition, ConditionStatus,
};

/// Mark the autoscaler available. Returns true if the status changed.
pub fn set_available(status: &mut AutoscalerStatus, now: DateTime<Utc>) -> bool {
    transition(
        status,
        ConditionStatus::True,
        AutoscalerPhase::Available,
        "Available",
        "managed scaler is up to date",
        now,
    )
}

/// Mark the autoscaler unavailable. Returns true if the status changed.
///
/// `message` is recorded only on the transition; later failures while
/// already unavailable leave the condition untouched.
pub fn set_unavailable(status: &mut AutoscalerStatus, now: DateTime<Utc>, message: &str) -> bool {
    transition(
        status,
        ConditionStatus::False,
        AutoscalerPhase::Unavailable,
        "Unavailable",
        message,
        now,
    )
}

fn transition(
    status: &mut AutoscalerStatus,
    value: ConditionStatus,
    phase: AutoscalerPhase,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> bool {
    if status
        .condition(AVAILABLE_CONDITION)
        .is_some_and(|c| c.status == value)
    {
        return false;
    }

    status.set_condition(Condition {
        kind: AVAILABLE_CONDITION.to_string(),
        status: value,
        reason: reason.to_string(),
        message: message.to_string(),
        last_transition_time: now,
    });
    status.phase = Some(phase);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn first_available_creates_condition() {
        let mut status = AutoscalerStatus::default();
        assert!(set_available(&mut status, t(100)));

        let cond = status.condition(AVAILABLE_CONDITION).unwrap();
        assert_eq!(cond.status, ConditionStatus::True);
        assert_eq!(cond.last_transition_time, t(100));
        assert_eq!(status.phase, Some(AutoscalerPhase::Available));
    }

    #[test]
    fn repeated_available_is_a_noop() {
        let mut status = AutoscalerStatus::default();
        set_available(&mut status, t(100));
        let before = status.clone();

        assert!(!set_available(&mut status, t(200)));
        assert_eq!(status, before);
    }

    #[test]
    fn unavailable_transition_moves_timestamp() {
        let mut status = AutoscalerStatus::default();
        set_available(&mut status, t(100));

        assert!(set_unavailable(&mut status, t(200), "write rejected"));
        let cond = status.condition(AVAILABLE_CONDITION).unwrap();
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.message, "write rejected");
        assert_eq!(cond.last_transition_time, t(200));
        assert_eq!(status.phase, Some(AutoscalerPhase::Unavailable));

        // Still failing: no rewrite, first message kept.
        assert!(!set_unavailable(&mut status, t(300), "another error"));
        let cond = status.condition(AVAILABLE_CONDITION).unwrap();
        assert_eq!(cond.message, "write rejected");
        assert_eq!(cond.last_transition_time, t(200));
    }

    #[test]
    fn recovery_flips_back_to_available() {
        let mut status = AutoscalerStatus::default();
        set_unavailable(&mut status, t(100), "bad window");

        assert!(set_available(&mut status, t(400)));
        let cond = status.condition(AVAILABLE_CONDITION).unwrap();
        assert_eq!(cond.status, ConditionStatus::True);
        assert_eq!(cond.last_transition_time, t(400));
        assert_eq!(status.conditions.len(), 1);
    }
}
