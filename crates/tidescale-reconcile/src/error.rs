//! Error types for the reconciler.

use thiserror::Error;

use tidescale_core::ObjectKey;
use tidescale_schedule::ScheduleError;
use tidescale_state::StateError;

/// Result type alias for `ScalingClient` calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failure reported by the orchestration backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Lost a create/update race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend temporarily unreachable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Lookup/creation races and temporary outages. A retry of the whole
    /// pass is expected to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::NotFound(_) | ClientError::Conflict(_) | ClientError::Unavailable(_)
        )
    }
}

impl From<StateError> for ClientError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(msg) => ClientError::NotFound(msg),
            StateError::Conflict(msg) => ClientError::Conflict(msg),
            StateError::Open(_) | StateError::Transaction(_) | StateError::Read(_) => {
                ClientError::Unavailable(err.to_string())
            }
            StateError::Table(_)
            | StateError::Write(_)
            | StateError::Serialize(_)
            | StateError::Deserialize(_) => ClientError::Rejected(err.to_string()),
        }
    }
}

/// Why a reconciliation pass did not complete.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The autoscaler was deleted; there is nothing left to reconcile.
    #[error("autoscaler {0} no longer exists")]
    Gone(ObjectKey),

    /// A schedule is misconfigured.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("{action} failed for {key}: {source}")]
    Client {
        key: ObjectKey,
        action: &'static str,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    pub(crate) fn client(key: &ObjectKey, action: &'static str, source: ClientError) -> Self {
        ReconcileError::Client {
            key: key.clone(),
            action,
            source,
        }
    }

    /// No retry and no status update.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcileError::Gone(_))
    }

    /// Whether the failure should flip the autoscaler to `Unavailable`.
    pub fn marks_unavailable(&self) -> bool {
        match self {
            ReconcileError::Gone(_) => false,
            ReconcileError::Schedule(_) => true,
            ReconcileError::Client { source, .. } => !source.is_transient(),
        }
    }
}
