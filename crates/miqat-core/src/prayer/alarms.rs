//! Which boundaries the user wants an alarm for.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::time::Boundary;
use crate::error::{CoreError, StorageError, ValidationError};
use crate::storage::{load_json, save_json, KeyValueStore};

const ALARMS_KEY: &str = "prayer_alarms";

/// Enabled flags for the alarmable boundaries. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSet {
    #[serde(default)]
    pub dawn: bool,
    #[serde(default)]
    pub midday: bool,
    #[serde(default)]
    pub sunset: bool,
}

impl AlarmSet {
    pub fn is_enabled(&self, boundary: Boundary) -> bool {
        match boundary {
            Boundary::Dawn => self.dawn,
            Boundary::Midday => self.midday,
            Boundary::Sunset => self.sunset,
            Boundary::PreDawn | Boundary::Midnight => false,
        }
    }

    pub fn set(&mut self, boundary: Boundary, enabled: bool) -> Result<(), ValidationError> {
        match boundary {
            Boundary::Dawn => self.dawn = enabled,
            Boundary::Midday => self.midday = enabled,
            Boundary::Sunset => self.sunset = enabled,
            Boundary::PreDawn | Boundary::Midnight => {
                return Err(ValidationError::NotAlarmable(boundary.to_string()))
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AlarmStore {
    store: Arc<dyn KeyValueStore>,
}

impl AlarmStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<AlarmSet, StorageError> {
        Ok(load_json(self.store.as_ref(), ALARMS_KEY)?.unwrap_or_default())
    }

    pub fn is_enabled(&self, boundary: Boundary) -> Result<bool, StorageError> {
        Ok(self.load()?.is_enabled(boundary))
    }

    pub fn set(&self, boundary: Boundary, enabled: bool) -> Result<AlarmSet, CoreError> {
        let mut set = self.load()?;
        set.set(boundary, enabled)?;
        save_json(self.store.as_ref(), ALARMS_KEY, &set)?;
        tracing::info!(%boundary, enabled, "alarm setting saved");
        Ok(set)
    }
}
