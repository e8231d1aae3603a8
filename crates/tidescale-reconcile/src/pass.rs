//! One reconciliation pass: select the active window and merge it.
//!
//! The pass is a pure function of its inputs. It performs no I/O and
//! never mutates the baseline, the windows, or the current spec.

use chrono::{DateTime, Utc};

use tidescale_core::ScalingSpec;
use tidescale_schedule::{ScheduleResult, Window, select_active};

/// Output of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Name of the active window, if any.
    pub active: Option<String>,
    /// Spec to write into the managed scaler.
    pub spec: ScalingSpec,
    /// True while a window is overriding the baseline. False means the
    /// baseline was restored verbatim.
    pub changed: bool,
}

/// Compute the next scaler spec for `now`.
///
/// With an active window the result starts from `current` and applies the
/// window's overrides (see [`apply_window`]). Without one the baseline is
/// returned verbatim, discarding any override left by an earlier window.
pub fn reconcile_schedule(
    baseline: &ScalingSpec,
    windows: &[Window],
    now: DateTime<Utc>,
    current: &ScalingSpec,
) -> ScheduleResult<Reconciliation> {
    let reconciliation = match select_active(now, windows)? {
        Some(window) => Reconciliation {
            active: Some(window.name.clone()),
            spec: apply_window(baseline, window, current),
            changed: true,
        },
        None => Reconciliation {
            active: None,
            spec: baseline.clone(),
            changed: false,
        },
    };
    Ok(reconciliation)
}

/// Overlay a window onto the current scaler spec.
///
/// `scale_target_ref` always follows the baseline and `max_replicas` falls
/// back to the baseline value. `min_replicas` and `metrics` are replaced
/// only when the window sets them; otherwise they, and `behavior`, keep
/// whatever the scaler currently has.
pub fn apply_window(baseline: &ScalingSpec, window: &Window, current: &ScalingSpec) -> ScalingSpec {
    let mut spec = current.clone();
    spec.scale_target_ref = baseline.scale_target_ref.clone();
    spec.max_replicas = window.max_replicas.unwrap_or(baseline.max_replicas);
    if let Some(min) = window.min_replicas {
        spec.min_replicas = Some(min);
    }
    if let Some(metrics) = &window.metrics {
        spec.metrics = metrics.clone();
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tidescale_core::{MetricSpec, ScaleTargetRef, ScalingBehavior, ScalingRules};
    use tidescale_schedule::DaySpec;

    fn spec(min: u32, max: u32, metrics: Vec<MetricSpec>) -> ScalingSpec {
        ScalingSpec {
            scale_target_ref: ScaleTargetRef {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
                name: "web".to_string(),
            },
            min_replicas: Some(min),
            max_replicas: max,
            metrics,
            behavior: None,
        }
    }

    fn cpu(percent: u32) -> MetricSpec {
        MetricSpec::resource_utilization("cpu", percent)
    }

    /// Monday-only window; days are Sunday-based indices.
    fn monday(name: &str, start: &str, end: &str) -> Window {
        Window {
            name: name.to_string(),
            start_day_of_week: DaySpec::Index(1),
            start_time: start.to_string(),
            end_day_of_week: DaySpec::Index(1),
            end_time: end.to_string(),
            utc_offset: None,
            min_replicas: None,
            max_replicas: None,
            metrics: None,
        }
    }

    /// 2024-01-01 is a Monday.
    fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn no_windows_restores_baseline() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let current = spec(3, 30, vec![cpu(50)]);

        let rec = reconcile_schedule(&baseline, &[], monday_at(10, 0), &current).unwrap();
        assert_eq!(rec.spec, baseline);
        assert!(!rec.changed);
        assert!(rec.active.is_none());
    }

    #[test]
    fn merge_only_overrides_set_fields() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let mut window = monday("peak", "09:00", "17:00");
        window.max_replicas = Some(20);

        let rec = reconcile_schedule(&baseline, &[window], monday_at(10, 0), &baseline).unwrap();
        assert_eq!(rec.spec, spec(1, 20, vec![cpu(80)]));
        assert!(rec.changed);
        assert_eq!(rec.active.as_deref(), Some("peak"));
    }

    #[test]
    fn metrics_are_replaced_not_merged() {
        let baseline = spec(1, 10, vec![cpu(80), MetricSpec::resource_utilization("memory", 70)]);
        let mut window = monday("peak", "09:00", "17:00");
        window.metrics = Some(vec![cpu(50)]);

        let rec = reconcile_schedule(&baseline, &[window], monday_at(10, 0), &baseline).unwrap();
        assert_eq!(rec.spec.metrics, vec![cpu(50)]);
        assert_eq!(rec.spec.max_replicas, 10);
    }

    #[test]
    fn noop_window_still_counts_as_active() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let window = monday("quiet", "09:00", "17:00");
        assert!(window.is_noop());

        let rec = reconcile_schedule(&baseline, &[window], monday_at(10, 0), &baseline).unwrap();
        assert_eq!(rec.spec, baseline);
        assert!(rec.changed);
    }

    #[test]
    fn unset_overrides_keep_current_values_while_active() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        // Left behind by a previous window.
        let mut current = spec(4, 40, vec![cpu(60)]);
        current.behavior = Some(ScalingBehavior {
            scale_up: None,
            scale_down: Some(ScalingRules {
                stabilization_window_seconds: Some(600),
                select_policy: None,
                policies: Vec::new(),
            }),
        });
        current.scale_target_ref.name = "stale".to_string();

        let mut window = monday("peak", "09:00", "17:00");
        window.max_replicas = Some(20);

        let rec = reconcile_schedule(&baseline, &[window], monday_at(10, 0), &current).unwrap();
        assert_eq!(rec.spec.min_replicas, Some(4));
        assert_eq!(rec.spec.metrics, vec![cpu(60)]);
        assert_eq!(rec.spec.behavior, current.behavior);
        assert_eq!(rec.spec.max_replicas, 20);
        assert_eq!(rec.spec.scale_target_ref, baseline.scale_target_ref);
    }

    #[test]
    fn max_falls_back_to_baseline_when_not_overridden() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let current = spec(1, 40, vec![cpu(80)]);
        let mut window = monday("floor", "09:00", "17:00");
        window.min_replicas = Some(3);

        let rec = reconcile_schedule(&baseline, &[window], monday_at(10, 0), &current).unwrap();
        assert_eq!(rec.spec.min_replicas, Some(3));
        assert_eq!(rec.spec.max_replicas, 10);
    }

    #[test]
    fn pass_is_idempotent_and_does_not_mutate_inputs() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let mut window = monday("peak", "09:00", "17:00");
        window.max_replicas = Some(20);
        let windows = vec![window];
        let windows_before = windows.clone();
        let baseline_before = baseline.clone();

        let first = reconcile_schedule(&baseline, &windows, monday_at(10, 0), &baseline).unwrap();
        let second = reconcile_schedule(&baseline, &windows, monday_at(10, 0), &baseline).unwrap();

        assert_eq!(first, second);
        assert_eq!(windows, windows_before);
        assert_eq!(baseline, baseline_before);
    }

    #[test]
    fn reverts_to_baseline_after_window_ends() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let mut window = monday("peak", "09:00", "17:00");
        window.min_replicas = Some(5);
        window.max_replicas = Some(20);
        window.metrics = Some(vec![cpu(40)]);
        let windows = vec![window];

        let during = reconcile_schedule(&baseline, &windows, monday_at(16, 59), &baseline).unwrap();
        assert_eq!(during.spec, spec(5, 20, vec![cpu(40)]));

        let after = reconcile_schedule(&baseline, &windows, monday_at(17, 0), &during.spec).unwrap();
        assert_eq!(after.spec, baseline);
        assert!(!after.changed);
    }

    #[test]
    fn overlapping_windows_end_to_end() {
        let baseline = spec(1, 5, vec![cpu(80)]);
        let mut all_day = monday("w1", "09:00", "17:00");
        all_day.max_replicas = Some(20);
        let mut lunch = monday("w2", "12:00", "14:00");
        lunch.max_replicas = Some(30);
        let windows = vec![lunch, all_day];

        let at_one = reconcile_schedule(&baseline, &windows, monday_at(13, 0), &baseline).unwrap();
        assert_eq!(at_one.active.as_deref(), Some("w1"));
        assert_eq!(at_one.spec.max_replicas, 20);

        let at_eight = reconcile_schedule(&baseline, &windows, monday_at(20, 0), &at_one.spec).unwrap();
        assert!(at_eight.active.is_none());
        assert_eq!(at_eight.spec.max_replicas, 5);
    }

    #[test]
    fn malformed_window_fails_the_pass() {
        let baseline = spec(1, 10, vec![cpu(80)]);
        let window = monday("bad", "25:99", "17:00");

        assert!(reconcile_schedule(&baseline, &[window], monday_at(10, 0), &baseline).is_err());
    }
}
