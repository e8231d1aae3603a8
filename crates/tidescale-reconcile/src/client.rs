//! The orchestration port the controller reconciles against.
//!
//! The controller only talks to the backend through [`ScalingClient`], so
//! it can be driven by the redb store in production and by in-memory
//! fakes in tests.

use tidescale_core::{AutoscalerStatus, ObjectKey};
use tidescale_state::{HorizontalScaler, Schedule, ScheduledAutoscaler, StateStore};

use crate::error::{ClientError, ClientResult};

pub trait ScalingClient {
    /// Keys of every scheduled autoscaler, for periodic resync.
    fn list_autoscalers(&self) -> ClientResult<Vec<ObjectKey>>;

    /// Fails with `NotFound` once the autoscaler is deleted.
    fn get_autoscaler(&self, key: &ObjectKey) -> ClientResult<ScheduledAutoscaler>;

    /// Schedules owned by the autoscaler. May be empty.
    fn list_schedules(&self, key: &ObjectKey) -> ClientResult<Vec<Schedule>>;

    /// Fails with `NotFound` if the scaler has not been created yet.
    fn get_scaler(&self, key: &ObjectKey) -> ClientResult<HorizontalScaler>;

    fn create_scaler(&self, scaler: &HorizontalScaler) -> ClientResult<HorizontalScaler>;

    fn update_scaler(&self, scaler: &HorizontalScaler) -> ClientResult<HorizontalScaler>;

    fn update_status(&self, key: &ObjectKey, status: &AutoscalerStatus) -> ClientResult<()>;
}

impl ScalingClient for StateStore {
    fn list_autoscalers(&self) -> ClientResult<Vec<ObjectKey>> {
        Ok(StateStore::list_autoscalers(self)?
            .iter()
            .map(ScheduledAutoscaler::key)
            .collect())
    }

    fn get_autoscaler(&self, key: &ObjectKey) -> ClientResult<ScheduledAutoscaler> {
        StateStore::get_autoscaler(self, key)?
            .ok_or_else(|| ClientError::NotFound(format!("autoscaler {key}")))
    }

    fn list_schedules(&self, key: &ObjectKey) -> ClientResult<Vec<Schedule>> {
        Ok(self.list_schedules_for(key)?)
    }

    fn get_scaler(&self, key: &ObjectKey) -> ClientResult<HorizontalScaler> {
        StateStore::get_scaler(self, key)?
            .ok_or_else(|| ClientError::NotFound(format!("scaler {key}")))
    }

    fn create_scaler(&self, scaler: &HorizontalScaler) -> ClientResult<HorizontalScaler> {
        Ok(StateStore::create_scaler(self, scaler)?)
    }

    fn update_scaler(&self, scaler: &HorizontalScaler) -> ClientResult<HorizontalScaler> {
        Ok(StateStore::update_scaler(self, scaler)?)
    }

    fn update_status(&self, key: &ObjectKey, status: &AutoscalerStatus) -> ClientResult<()> {
        Ok(self.update_autoscaler_status(key, status)?)
    }
}
