//! tidescale-reconcile — applies the active schedule window to the
//! managed horizontal scaler.
//!
//! # Architecture
//!
//! ```text
//! Controller::run (single task)
//!   ├── triggers: resync tick, API notifications, due retries
//!   ├── Controller::reconcile(key, now)
//!   │   ├── ScalingClient: load autoscaler, scaler, schedules
//!   │   ├── scaler missing → create from baseline, requeue
//!   │   ├── reconcile_schedule() → merged spec or baseline
//!   │   ├── ScalingClient::update_scaler
//!   │   └── set_available / set_unavailable → update_status on change
//!   └── RetryQueue (exponential backoff per key)
//! ```
//!
//! # Merge
//!
//! While a window is active the scaler keeps its current spec, except
//! that `scale_target_ref` follows the baseline, `max_replicas` is the
//! window's value or the baseline's, and `min_replicas` and `metrics` are
//! replaced when the window sets them. Outside all windows the baseline
//! is written back verbatim.
//!
//! Misconfigured schedules and rejected writes flip the autoscaler to
//! `Unavailable`; conflicts and outages are retried silently.

pub mod client;
pub mod controller;
pub mod error;
pub mod pass;
pub mod retry;
pub mod status;

pub use client::ScalingClient;
pub use controller::{
    Controller, ReconcileOutcome, TriggerReceiver, TriggerSender, trigger_channel,
};
pub use error::{ClientError, ClientResult, ReconcileError};
pub use pass::{Reconciliation, apply_window, reconcile_schedule};
pub use retry::{Backoff, RetryQueue};
pub use status::{set_available, set_unavailable};
