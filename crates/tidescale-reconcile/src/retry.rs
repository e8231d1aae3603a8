//! Per-key retry scheduling with exponential backoff.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use tidescale_core::config::MAX_CONTROLLER_DURATION;
use tidescale_core::{ControllerTimings, ObjectKey};

/// Exponential backoff: starts at `base`, doubles per failure, capped at
/// `max`. Both are clamped to [`MAX_CONTROLLER_DURATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.min(MAX_CONTROLLER_DURATION);
        Self {
            base,
            max: max.clamp(base, MAX_CONTROLLER_DURATION),
        }
    }

    pub fn from_timings(timings: &ControllerTimings) -> Self {
        Self::new(timings.backoff_base, timings.backoff_max)
    }

    /// Delay before the retry that follows `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exp).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    failures: u32,
    due: Instant,
}

/// Keys waiting to be retried after a failed pass.
#[derive(Debug)]
pub struct RetryQueue {
    backoff: Backoff,
    pending: HashMap<ObjectKey, Pending>,
}

impl RetryQueue {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            pending: HashMap::new(),
        }
    }

    /// Record a failure for `key` and schedule its retry. Returns the delay.
    pub fn record_failure(&mut self, key: &ObjectKey, now: Instant) -> Duration {
        let failures = self.pending.get(key).map_or(0, |p| p.failures) + 1;
        let delay = self.backoff.delay(failures);
        self.pending.insert(
            key.clone(),
            Pending {
                failures,
                due: deadline(now, delay),
            },
        );
        delay
    }

    /// Forget `key` after a successful pass or deletion.
    pub fn clear(&mut self, key: &ObjectKey) {
        self.pending.remove(key);
    }

    pub fn is_pending(&self, key: &ObjectKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.pending.get(key).map_or(0, |p| p.failures)
    }

    /// Earliest retry deadline, if anything is pending.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Keys whose retry deadline has passed, in key order. They stay
    /// pending until cleared or failed again.
    pub fn take_due(&mut self, now: Instant) -> Vec<ObjectKey> {
        let mut due: Vec<ObjectKey> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();
        due.sort();
        // Pushed out so the same key is not handed back before its pass ends.
        for key in &due {
            if let Some(p) = self.pending.get_mut(key) {
                p.due = deadline(now, self.backoff.delay(p.failures));
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or(now)
}
