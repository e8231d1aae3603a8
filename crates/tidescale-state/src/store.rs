//! StateStore — redb-backed object persistence for tidescale.
//!
//! Provides typed operations over scheduled autoscalers, their schedules,
//! and the horizontal scalers they manage. All values are JSON-serialized
//! into redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).
//!
//! Ownership is enforced here: deleting an autoscaler removes its
//! schedules and the scaler it controls in the same transaction.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use tidescale_core::{AutoscalerStatus, ObjectKey};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
        txn.open_table(SCHEDULES).map_err(map_err!(Table))?;
        txn.open_table(SCALERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Scheduled autoscalers ──────────────────────────────────────

    /// Insert or replace a scheduled autoscaler.
    pub fn put_autoscaler(&self, autoscaler: &ScheduledAutoscaler) -> StateResult<()> {
        let key = autoscaler.table_key();
        self.put_json(AUTOSCALERS, &key, autoscaler)?;
        debug!(%key, "autoscaler stored");
        Ok(())
    }

    pub fn get_autoscaler(&self, key: &ObjectKey) -> StateResult<Option<ScheduledAutoscaler>> {
        self.get_json(AUTOSCALERS, &key.to_string())
    }

    /// List every scheduled autoscaler.
    pub fn list_autoscalers(&self) -> StateResult<Vec<ScheduledAutoscaler>> {
        self.list_json(AUTOSCALERS, "")
    }

    /// Replace only the status of an autoscaler. Fails with `NotFound`
    /// if the autoscaler was deleted.
    pub fn update_autoscaler_status(
        &self,
        key: &ObjectKey,
        status: &AutoscalerStatus,
    ) -> StateResult<()> {
        let table_key = key.to_string();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
            let current: Option<ScheduledAutoscaler> =
                match table.get(table_key.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => Some(
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                };
            let mut autoscaler = current
                .ok_or_else(|| StateError::NotFound(format!("autoscaler {table_key}")))?;
            autoscaler.status = status.clone();

            let value = serde_json::to_vec(&autoscaler).map_err(map_err!(Serialize))?;
            table
                .insert(table_key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %table_key, "autoscaler status stored");
        Ok(())
    }

    /// Delete an autoscaler together with the schedules and scaler it owns.
    /// Returns true if the autoscaler existed.
    pub fn delete_autoscaler(&self, key: &ObjectKey) -> StateResult<bool> {
        let table_key = key.to_string();
        let prefix = schedule_prefix(key);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        let schedules_removed;
        let mut scaler_removed = false;
        {
            let mut autoscalers = txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
            existed = autoscalers
                .remove(table_key.as_str())
                .map_err(map_err!(Write))?
                .is_some();

            let mut schedules = txn.open_table(SCHEDULES).map_err(map_err!(Table))?;
            let mut owned = Vec::new();
            for entry in schedules.iter().map_err(map_err!(Read))? {
                let (k, _) = entry.map_err(map_err!(Read))?;
                if k.value().starts_with(&prefix) {
                    owned.push(k.value().to_string());
                }
            }
            for k in &owned {
                schedules.remove(k.as_str()).map_err(map_err!(Write))?;
            }
            schedules_removed = owned.len();

            let mut scalers = txn.open_table(SCALERS).map_err(map_err!(Table))?;
            let scaler: Option<HorizontalScaler> =
                match scalers.get(table_key.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => Some(
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                };
            if scaler.is_some_and(|s| s.is_controlled_by(key)) {
                scalers
                    .remove(table_key.as_str())
                    .map_err(map_err!(Write))?;
                scaler_removed = true;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            key = %table_key,
            existed,
            schedules_removed,
            scaler_removed,
            "autoscaler deleted"
        );
        Ok(existed)
    }

    // ── Schedules ──────────────────────────────────────────────────

    /// Insert or replace a schedule.
    pub fn put_schedule(&self, schedule: &Schedule) -> StateResult<()> {
        let key = schedule.table_key();
        self.put_json(SCHEDULES, &key, schedule)?;
        debug!(%key, "schedule stored");
        Ok(())
    }

    pub fn get_schedule(&self, owner: &ObjectKey, name: &str) -> StateResult<Option<Schedule>> {
        self.get_json(SCHEDULES, &schedule_table_key(owner, name))
    }

    /// List the schedules owned by an autoscaler, in key order.
    pub fn list_schedules_for(&self, owner: &ObjectKey) -> StateResult<Vec<Schedule>> {
        self.list_json(SCHEDULES, &schedule_prefix(owner))
    }

    /// Delete a schedule. Returns true if it existed.
    pub fn delete_schedule(&self, owner: &ObjectKey, name: &str) -> StateResult<bool> {
        let key = schedule_table_key(owner, name);
        let existed = self.delete_key(SCHEDULES, &key)?;
        debug!(%key, existed, "schedule deleted");
        Ok(existed)
    }

    // ── Horizontal scalers ─────────────────────────────────────────

    pub fn get_scaler(&self, key: &ObjectKey) -> StateResult<Option<HorizontalScaler>> {
        self.get_json(SCALERS, &key.to_string())
    }

    /// Create a scaler. Fails with `Conflict` if one already exists.
    ///
    /// Returns the stored object with its initial resource version.
    pub fn create_scaler(&self, scaler: &HorizontalScaler) -> StateResult<HorizontalScaler> {
        let key = scaler.table_key();
        let mut created = scaler.clone();
        created.resource_version = 1;
        let value = serde_json::to_vec(&created).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SCALERS).map_err(map_err!(Table))?;
            let exists = table.get(key.as_str()).map_err(map_err!(Read))?.is_some();
            if exists {
                return Err(StateError::Conflict(format!("scaler {key} already exists")));
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "scaler created");
        Ok(created)
    }

    /// Update a scaler with optimistic concurrency.
    ///
    /// `scaler.resource_version` must match the stored version, otherwise
    /// the write fails with `Conflict`. Returns the stored object with its
    /// new resource version.
    pub fn update_scaler(&self, scaler: &HorizontalScaler) -> StateResult<HorizontalScaler> {
        let key = scaler.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(SCALERS).map_err(map_err!(Table))?;
            let current: Option<HorizontalScaler> =
                match table.get(key.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => Some(
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                };
            let current = current.ok_or_else(|| StateError::NotFound(format!("scaler {key}")))?;
            if current.resource_version != scaler.resource_version {
                return Err(StateError::Conflict(format!(
                    "scaler {key} is at version {}, update was based on {}",
                    current.resource_version, scaler.resource_version
                )));
            }

            let mut next = scaler.clone();
            next.resource_version = current.resource_version + 1;
            let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            updated = next;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version = updated.resource_version, "scaler updated");
        Ok(updated)
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn put_json<T: Serialize>(&self, def: JsonTable, key: &str, value: &T) -> StateResult<()> {
        let value = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(def).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, def: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// All values whose key starts with `prefix` (empty prefix lists all).
    fn list_json<T: DeserializeOwned>(&self, def: JsonTable, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }

    fn delete_key(&self, def: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(def).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}
