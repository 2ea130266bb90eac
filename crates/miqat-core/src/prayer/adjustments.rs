//! Per-user minute offsets for each boundary.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::time::Boundary;
use crate::error::{CoreError, StorageError, ValidationError};
use crate::storage::{load_json, save_json, KeyValueStore};

const ADJUSTMENTS_KEY: &str = "prayer_adjustments";

/// Accepted offset range in minutes.
pub const ADJUSTMENT_RANGE: RangeInclusive<i32> = -25..=25;

/// Signed minute offset per boundary; absent entries mean 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentSet(BTreeMap<Boundary, i32>);

impl AdjustmentSet {
    pub fn get(&self, boundary: Boundary) -> i32 {
        self.0.get(&boundary).copied().unwrap_or(0)
    }

    /// Set an offset after checking it against [`ADJUSTMENT_RANGE`].
    pub fn set(&mut self, boundary: Boundary, minutes: i32) -> Result<(), ValidationError> {
        validate(boundary, minutes)?;
        if minutes == 0 {
            self.0.remove(&boundary);
        } else {
            self.0.insert(boundary, minutes);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Boundary, i32)> + '_ {
        Boundary::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    /// Drop entries a hand-edited store may hold outside the range.
    fn sanitized(mut self) -> Self {
        self.0.retain(|boundary, minutes| {
            let keep = ADJUSTMENT_RANGE.contains(minutes);
            if !keep {
                tracing::warn!(%boundary, minutes = *minutes, "ignoring out-of-range stored adjustment");
            }
            keep
        });
        self
    }
}

fn validate(boundary: Boundary, minutes: i32) -> Result<(), ValidationError> {
    if ADJUSTMENT_RANGE.contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            boundary: boundary.to_string(),
            minutes,
            min: *ADJUSTMENT_RANGE.start(),
            max: *ADJUSTMENT_RANGE.end(),
        })
    }
}

/// Adjustment persistence, one JSON object under a user-scoped key.
#[derive(Clone)]
pub struct AdjustmentStore {
    store: Arc<dyn KeyValueStore>,
}

impl AdjustmentStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<AdjustmentSet, StorageError> {
        Ok(load_json::<AdjustmentSet>(self.store.as_ref(), ADJUSTMENTS_KEY)?
            .unwrap_or_default()
            .sanitized())
    }

    pub fn get(&self, boundary: Boundary) -> Result<i32, StorageError> {
        Ok(self.load()?.get(boundary))
    }

    pub fn set(&self, boundary: Boundary, minutes: i32) -> Result<(), CoreError> {
        let mut set = self.load()?;
        set.set(boundary, minutes)?;
        save_json(self.store.as_ref(), ADJUSTMENTS_KEY, &set)?;
        tracing::info!(%boundary, minutes, "adjustment saved");
        Ok(())
    }

    pub fn reset(&self) -> Result<(), StorageError> {
        self.store.remove(ADJUSTMENTS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> AdjustmentStore {
        AdjustmentStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn defaults_to_zero() {
        let adj = store();
        for b in Boundary::ALL {
            assert_eq!(adj.get(b).unwrap(), 0);
        }
    }

    #[test]
    fn set_and_reset() {
        let adj = store();
        adj.set(Boundary::Dawn, 2).unwrap();
        adj.set(Boundary::Midnight, -25).unwrap();
        assert_eq!(adj.get(Boundary::Dawn).unwrap(), 2);
        assert_eq!(adj.get(Boundary::Midnight).unwrap(), -25);
        adj.reset().unwrap();
        assert_eq!(adj.get(Boundary::Dawn).unwrap(), 0);
    }

    #[test]
    fn rejects_out_of_range() {
        let adj = store();
        let err = adj.set(Boundary::Sunset, 26).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { minutes: 26, .. })
        ));
        assert!(adj.set(Boundary::Sunset, -26).is_err());
        assert_eq!(adj.get(Boundary::Sunset).unwrap(), 0);
    }

    #[test]
    fn stored_document_uses_boundary_names() {
        let backing = Arc::new(MemoryStore::new());
        let adj = AdjustmentStore::new(backing.clone());
        adj.set(Boundary::PreDawn, -3).unwrap();
        assert_eq!(
            backing.get(ADJUSTMENTS_KEY).unwrap().as_deref(),
            Some(r#"{"pre_dawn":-3}"#)
        );
    }

    #[test]
    fn tampered_values_are_ignored() {
        let backing = Arc::new(MemoryStore::new());
        backing
            .set(ADJUSTMENTS_KEY, r#"{"dawn":90,"midday":4}"#)
            .unwrap();
        let adj = AdjustmentStore::new(backing);
        assert_eq!(adj.get(Boundary::Dawn).unwrap(), 0);
        assert_eq!(adj.get(Boundary::Midday).unwrap(), 4);
    }
}
