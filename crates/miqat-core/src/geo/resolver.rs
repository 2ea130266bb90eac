//! Coordinate resolution with stored, device and fallback sources.
//!
//! Order of preference:
//! 1. A previously stored coordinate, returned without prompting.
//! 2. A device fix, bounded by the request timeout and maximum fix age.
//! 3. The configured fallback city.
//!
//! Whatever is returned is persisted, so once the device has failed the
//! fallback is reused without prompting until [`GeoResolver::redetect`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{nearest_reference, Coordinate, DeviceLocator, LocateRequest};
use crate::error::{LocationError, StorageError};
use crate::storage::{load_json, save_json, KeyValueStore, LocationConfig};

const LOCATION_KEY: &str = "last_location";
const LABEL_KEY: &str = "location_label";

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationSource {
    Stored,
    Device,
    /// The fallback city. `reason` is absent when the fallback was already
    /// stored from an earlier failed attempt.
    Fallback {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub coordinate: Coordinate,
    pub label: String,
    pub source: LocationSource,
}

impl Resolution {
    /// Soft, dismissible notice for the user when the fallback is in use.
    pub fn notice(&self) -> Option<String> {
        match &self.source {
            LocationSource::Fallback { reason } => Some(match reason {
                Some(reason) => format!(
                    "Location unavailable ({reason}); showing times for {}",
                    self.label
                ),
                None => format!("Showing times for default location {}", self.label),
            }),
            _ => None,
        }
    }
}

pub struct GeoResolver {
    store: Arc<dyn KeyValueStore>,
    locator: Arc<dyn DeviceLocator>,
    fallback: Coordinate,
    fallback_label: String,
    request: LocateRequest,
}

impl GeoResolver {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        locator: Arc<dyn DeviceLocator>,
        config: &LocationConfig,
    ) -> Self {
        Self {
            store,
            locator,
            fallback: config.fallback(),
            fallback_label: config.fallback_label.clone(),
            request: LocateRequest {
                timeout: std::time::Duration::from_secs(config.detect_timeout_secs),
                max_age: std::time::Duration::from_secs(config.max_fix_age_secs),
                high_accuracy: false,
            },
        }
    }

    pub fn fallback(&self) -> Coordinate {
        self.fallback
    }

    /// Resolve a usable coordinate. Never fails outward on location errors.
    pub async fn resolve(&self) -> Result<Resolution, StorageError> {
        if let Some(stored) = self.stored()? {
            if stored.approx_eq(&self.fallback) {
                return Ok(self.fallback_resolution(None));
            }
            return Ok(Resolution {
                coordinate: stored,
                label: self.stored_label(&stored)?,
                source: LocationSource::Stored,
            });
        }
        self.redetect().await
    }

    /// Ask the device again, ignoring any stored coordinate.
    pub async fn redetect(&self) -> Result<Resolution, StorageError> {
        match self.request_fix().await {
            Ok(coordinate) => {
                let resolution = Resolution {
                    coordinate,
                    label: nearest_reference(&coordinate).name.to_string(),
                    source: LocationSource::Device,
                };
                self.persist(&resolution)?;
                tracing::info!(
                    coordinate = %coordinate,
                    label = %resolution.label,
                    "location detected"
                );
                Ok(resolution)
            }
            Err(e) => {
                tracing::warn!(error = %e, "location unavailable, using fallback");
                let resolution = self.fallback_resolution(Some(e.to_string()));
                self.persist(&resolution)?;
                Ok(resolution)
            }
        }
    }

    /// Store a coordinate chosen by the user.
    pub fn set_manual(&self, coordinate: Coordinate) -> Result<Resolution, StorageError> {
        let resolution = Resolution {
            coordinate,
            label: nearest_reference(&coordinate).name.to_string(),
            source: LocationSource::Stored,
        };
        self.persist(&resolution)?;
        Ok(resolution)
    }

    async fn request_fix(&self) -> Result<Coordinate, LocationError> {
        let fix = tokio::time::timeout(self.request.timeout, self.locator.locate(&self.request))
            .await
            .map_err(|_| LocationError::Timeout {
                timeout_secs: self.request.timeout.as_secs(),
            })??;
        if fix.age > self.request.max_age {
            return Err(LocationError::StaleFix {
                age_secs: fix.age.as_secs(),
            });
        }
        if !fix.coordinate.is_valid() {
            return Err(LocationError::Unavailable);
        }
        Ok(fix.coordinate)
    }

    fn stored(&self) -> Result<Option<Coordinate>, StorageError> {
        Ok(load_json::<Coordinate>(self.store.as_ref(), LOCATION_KEY)?.filter(Coordinate::is_valid))
    }

    fn stored_label(&self, coordinate: &Coordinate) -> Result<String, StorageError> {
        Ok(self
            .store
            .get(LABEL_KEY)?
            .unwrap_or_else(|| nearest_reference(coordinate).name.to_string()))
    }

    fn fallback_resolution(&self, reason: Option<String>) -> Resolution {
        Resolution {
            coordinate: self.fallback,
            label: self.fallback_label.clone(),
            source: LocationSource::Fallback { reason },
        }
    }

    fn persist(&self, resolution: &Resolution) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), LOCATION_KEY, &resolution.coordinate)?;
        self.store.set(LABEL_KEY, &resolution.label)
    }
}
