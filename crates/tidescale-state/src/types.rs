//! Object types persisted by the tidescale state store.
//!
//! A `ScheduledAutoscaler` owns any number of `Schedule`s (by name, in the
//! same namespace) and at most one `HorizontalScaler`, which shares its
//! namespace and name. All types are serializable to/from JSON for storage
//! in redb tables.

use serde::{Deserialize, Serialize};

use tidescale_core::{AutoscalerStatus, ObjectKey, ScalingSpec};
use tidescale_schedule::Window;

/// Kind recorded in owner references pointing at a scheduled autoscaler.
pub const AUTOSCALER_KIND: &str = "ScheduledAutoscaler";

// ── Scheduled autoscaler ──────────────────────────────────────────

/// The parent configuration: a baseline scaling spec plus observed status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledAutoscaler {
    pub namespace: String,
    pub name: String,
    pub spec: ScheduledAutoscalerSpec,
    #[serde(default)]
    pub status: AutoscalerStatus,
    /// Unix timestamp (seconds) when this object was created.
    #[serde(default)]
    pub created_at: u64,
    /// Unix timestamp (seconds) when the spec was last changed.
    #[serde(default)]
    pub updated_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledAutoscalerSpec {
    /// Applied whenever no schedule is active.
    pub baseline: ScalingSpec,
}

// ── Schedule ──────────────────────────────────────────────────────

/// A window registered against a scheduled autoscaler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub namespace: String,
    /// Name of the owning scheduled autoscaler.
    pub owner: String,
    pub window: Window,
    #[serde(default)]
    pub created_at: u64,
}

// ── Horizontal scaler ─────────────────────────────────────────────

/// Back-reference from an owned object to its controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub controller: bool,
}

impl OwnerReference {
    /// Controller reference to a scheduled autoscaler.
    pub fn autoscaler(name: &str) -> Self {
        Self {
            kind: AUTOSCALER_KIND.to_string(),
            name: name.to_string(),
            controller: true,
        }
    }
}

/// The external scaling object the controller writes into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorizontalScaler {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerReference>,
    pub spec: ScalingSpec,
    /// Bumped on every write; updates must present the current value.
    #[serde(default)]
    pub resource_version: u64,
}

// ── Keys ──────────────────────────────────────────────────────────

impl ScheduledAutoscaler {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Build the composite key for the autoscalers table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl Schedule {
    /// Key of the owning scheduled autoscaler.
    pub fn owner_key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.owner)
    }

    /// Build the composite key for the schedules table.
    pub fn table_key(&self) -> String {
        schedule_table_key(&self.owner_key(), &self.window.name)
    }
}

impl HorizontalScaler {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Build the composite key for the scalers table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether `owner` is this scaler's controller.
    pub fn is_controlled_by(&self, owner: &ObjectKey) -> bool {
        self.namespace == owner.namespace
            && self
                .owner
                .as_ref()
                .is_some_and(|o| o.controller && o.kind == AUTOSCALER_KIND && o.name == owner.name)
    }
}

pub(crate) fn schedule_table_key(owner: &ObjectKey, name: &str) -> String {
    format!("{}/{}/{}", owner.namespace, owner.name, name)
}

pub(crate) fn schedule_prefix(owner: &ObjectKey) -> String {
    format!("{}/{}/", owner.namespace, owner.name)
}
