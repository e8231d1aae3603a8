//! The controller: drives reconciliation passes against a `ScalingClient`.
//!
//! A single loop task owns every pass, so two passes for the same
//! autoscaler never overlap. Triggers that arrive while a pass runs are
//! queued and coalesced per key.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use tidescale_core::{ControllerTimings, ObjectKey, ScalingSpec};
use tidescale_schedule::Window;
use tidescale_state::{HorizontalScaler, OwnerReference, ScheduledAutoscaler};

use crate::client::ScalingClient;
use crate::error::{ClientError, ReconcileError};
use crate::pass::reconcile_schedule;
use crate::retry::{Backoff, RetryQueue};
use crate::status::{set_available, set_unavailable};

/// Sends change notifications to the controller loop.
pub type TriggerSender = mpsc::UnboundedSender<ObjectKey>;
pub type TriggerReceiver = mpsc::UnboundedReceiver<ObjectKey>;

/// Create the channel the API uses to notify the controller of changes.
pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    mpsc::unbounded_channel()
}

/// What a successful pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Active window name, if any.
    pub active: Option<String>,
    /// A window is overriding the baseline.
    pub changed: bool,
    /// The scaler did not exist and was created from the baseline.
    pub created: bool,
    /// Spec now stored in the scaler.
    pub spec: ScalingSpec,
}

pub struct Controller<C> {
    client: C,
    timings: ControllerTimings,
}

impl<C: ScalingClient> Controller<C> {
    pub fn new(client: C, timings: ControllerTimings) -> Self {
        Self { client, timings }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one pass for `key` and record the resulting availability.
    ///
    /// The status is written only when the `Available` condition changes.
    /// Transient failures and a vanished autoscaler leave it untouched.
    pub fn reconcile(
        &self,
        key: &ObjectKey,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let mut autoscaler = match self.client.get_autoscaler(key) {
            Ok(autoscaler) => autoscaler,
            Err(ClientError::NotFound(_)) => return Err(ReconcileError::Gone(key.clone())),
            Err(e) => return Err(ReconcileError::client(key, "get autoscaler", e)),
        };

        let result = self.sync(&autoscaler, now);

        let transitioned = match &result {
            Ok(_) => set_available(&mut autoscaler.status, now),
            Err(e) if e.marks_unavailable() => {
                set_unavailable(&mut autoscaler.status, now, &e.to_string())
            }
            Err(_) => false,
        };
        if transitioned {
            info!(
                autoscaler = %key,
                available = result.is_ok(),
                "availability changed"
            );
            if let Err(e) = self.client.update_status(key, &autoscaler.status) {
                if result.is_ok() {
                    return Err(ReconcileError::client(key, "update status", e));
                }
                warn!(autoscaler = %key, error = %e, "failed to record unavailable status");
            }
        }

        result
    }

    fn sync(
        &self,
        autoscaler: &ScheduledAutoscaler,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = autoscaler.key();
        let baseline = &autoscaler.spec.baseline;

        let scaler = match self.client.get_scaler(&key) {
            Ok(scaler) => scaler,
            Err(ClientError::NotFound(_)) => {
                let desired = HorizontalScaler {
                    namespace: autoscaler.namespace.clone(),
                    name: autoscaler.name.clone(),
                    owner: Some(OwnerReference::autoscaler(&autoscaler.name)),
                    spec: baseline.clone(),
                    resource_version: 0,
                };
                let created = self
                    .client
                    .create_scaler(&desired)
                    .map_err(|e| ReconcileError::client(&key, "create scaler", e))?;
                info!(autoscaler = %key, "created scaler from baseline");
                return Ok(ReconcileOutcome {
                    active: None,
                    changed: false,
                    created: true,
                    spec: created.spec,
                });
            }
            Err(e) => return Err(ReconcileError::client(&key, "get scaler", e)),
        };

        let windows: Vec<Window> = self
            .client
            .list_schedules(&key)
            .map_err(|e| ReconcileError::client(&key, "list schedules", e))?
            .into_iter()
            .map(|schedule| schedule.window)
            .collect();

        let rec = reconcile_schedule(baseline, &windows, now, &scaler.spec)?;

        // Written even when unchanged so that baseline edits always land.
        let mut next = scaler;
        next.spec = rec.spec;
        let stored = self
            .client
            .update_scaler(&next)
            .map_err(|e| ReconcileError::client(&key, "update scaler", e))?;

        debug!(
            autoscaler = %key,
            active = rec.active.as_deref().unwrap_or("-"),
            changed = rec.changed,
            max_replicas = stored.spec.max_replicas,
            "reconciled"
        );

        Ok(ReconcileOutcome {
            active: rec.active,
            changed: rec.changed,
            created: false,
            spec: stored.spec,
        })
    }

    /// Reconcile a batch of keys, requeueing freshly created scalers once
    /// and scheduling retries for failures.
    fn process(&self, work: BTreeSet<ObjectKey>, retries: &mut RetryQueue) {
        let mut queue: VecDeque<ObjectKey> = work.into_iter().collect();

        while let Some(key) = queue.pop_front() {
            match self.reconcile(&key, Utc::now()) {
                Ok(outcome) => {
                    retries.clear(&key);
                    if outcome.created {
                        queue.push_back(key);
                    }
                }
                Err(e) if e.is_fatal() => {
                    retries.clear(&key);
                    debug!(autoscaler = %key, "autoscaler gone, dropping");
                }
                Err(e) => {
                    let delay = retries.record_failure(&key, Instant::now());
                    if e.marks_unavailable() {
                        error!(autoscaler = %key, error = %e, "reconcile failed");
                    }
                    warn!(
                        autoscaler = %key,
                        error = %e,
                        attempt = retries.failures(&key),
                        retry_in_ms = delay.as_millis() as u64,
                        "scheduling retry"
                    );
                }
            }
        }
    }

    /// Every autoscaler except those waiting out a retry backoff.
    fn resync_work(&self, retries: &RetryQueue) -> BTreeSet<ObjectKey> {
        match self.client.list_autoscalers() {
            Ok(keys) => keys.into_iter().filter(|k| !retries.is_pending(k)).collect(),
            Err(e) => {
                warn!(error = %e, "resync listing failed");
                BTreeSet::new()
            }
        }
    }

    /// Run the controller loop until `shutdown` fires.
    pub async fn run(self, mut triggers: TriggerReceiver, mut shutdown: watch::Receiver<bool>) {
        info!(
            resync_secs = self.timings.resync_interval.as_secs(),
            "controller started"
        );

        let mut resync = tokio::time::interval(self.timings.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut retries = RetryQueue::new(Backoff::from_timings(&self.timings));

        loop {
            let retry_at = retries.next_due();

            let work = tokio::select! {
                _ = resync.tick() => self.resync_work(&retries),
                Some(key) = triggers.recv() => drain_triggers(key, &mut triggers),
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    retries.take_due(Instant::now()).into_iter().collect()
                }
                _ = shutdown.changed() => {
                    info!("controller shutting down");
                    break;
                }
            };

            self.process(work, &mut retries);
        }
    }
}

/// `first` plus everything already queued, one entry per key.
fn drain_triggers(first: ObjectKey, triggers: &mut TriggerReceiver) -> BTreeSet<ObjectKey> {
    let mut work = BTreeSet::from([first]);
    while let Ok(key) = triggers.try_recv() {
        work.insert(key);
    }
    work
}
